//! Every tunable of a run. The binary maps its flags onto [GeotagConfig], a
//! JSON file can be used as well.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use crate::article::Split;
use crate::errors::ConfigError;
use crate::grid::RegionGrid;
use crate::kml::KmlTransform;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, AsRefStr, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Find the location of every toponym of the evaluation files.
    GeotagToponyms,
    /// Find the region of every document of the evaluation set.
    #[default]
    GeotagDocuments,
    /// Write KML files with the region distributions of some words.
    GenerateKml,
    /// Segment documents into parts about a single location. Not supported.
    SegmentGeotagDocuments,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, AsRefStr, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum EvalFormat {
    TrConll,
    #[default]
    Wiki,
}

/// Where the word distribution and the link count of a candidate come from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, AsRefStr, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ContextType {
    Article,
    Region,
    #[default]
    RegionDistArticleLinks,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, AsRefStr, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum NaiveBayesWeighting {
    /// The prior and every word count the same.
    #[default]
    Equal,
    /// The words share `1 - baseline_weight`.
    EqualWords,
    /// Like [NaiveBayesWeighting::EqualWords] but closer words count more.
    DistanceWeighted,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, AsRefStr, Display, EnumString, EnumIter, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyName {
    #[strum(to_string = "baseline")]
    Baseline,
    #[strum(to_string = "none")]
    None,
    #[strum(to_string = "full-kl-divergence", serialize = "full-kldiv", serialize = "full-kl")]
    #[serde(alias = "full-kldiv", alias = "full-kl")]
    FullKlDivergence,
    #[strum(to_string = "partial-kl-divergence", serialize = "partial-kldiv", serialize = "partial-kl")]
    #[serde(alias = "partial-kldiv", alias = "partial-kl")]
    PartialKlDivergence,
    #[strum(
        to_string = "symmetric-full-kl-divergence",
        serialize = "sym-kldiv",
        serialize = "sym-kl",
        serialize = "sym-full-kldiv",
        serialize = "sym-full-kl"
    )]
    #[serde(alias = "sym-kldiv", alias = "sym-kl", alias = "sym-full-kldiv", alias = "sym-full-kl")]
    SymmetricFullKlDivergence,
    #[strum(to_string = "symmetric-partial-kl-divergence", serialize = "sym-partial-kldiv", serialize = "sym-partial-kl")]
    #[serde(alias = "sym-partial-kldiv", alias = "sym-partial-kl")]
    SymmetricPartialKlDivergence,
    #[strum(to_string = "cosine-similarity", serialize = "cossim")]
    #[serde(alias = "cossim")]
    CosineSimilarity,
    #[strum(to_string = "partial-cosine-similarity", serialize = "partial-cossim")]
    #[serde(alias = "partial-cossim")]
    PartialCosineSimilarity,
    #[strum(to_string = "smoothed-cosine-similarity", serialize = "smoothed-cossim")]
    #[serde(alias = "smoothed-cossim")]
    SmoothedCosineSimilarity,
    #[strum(to_string = "smoothed-partial-cosine-similarity", serialize = "smoothed-partial-cossim")]
    #[serde(alias = "smoothed-partial-cossim")]
    SmoothedPartialCosineSimilarity,
    #[strum(to_string = "average-cell-probability", serialize = "avg-cell-prob", serialize = "acp")]
    #[serde(alias = "avg-cell-prob", alias = "acp")]
    AverageCellProbability,
    #[strum(to_string = "naive-bayes-with-baseline", serialize = "nb-base")]
    #[serde(alias = "nb-base")]
    NaiveBayesWithBaseline,
    #[strum(to_string = "naive-bayes-no-baseline", serialize = "nb-nobase")]
    #[serde(alias = "nb-nobase")]
    NaiveBayesNoBaseline,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, AsRefStr, Display, EnumString, EnumIter, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BaselineStrategyName {
    #[default]
    #[strum(to_string = "internal-link", serialize = "link")]
    #[serde(alias = "link")]
    InternalLink,
    #[strum(to_string = "random")]
    Random,
    #[strum(to_string = "num-articles", serialize = "num-arts", serialize = "numarts")]
    #[serde(alias = "num-arts", alias = "numarts")]
    NumArticles,
    #[strum(to_string = "link-most-common-toponym")]
    LinkMostCommonToponym,
    #[strum(to_string = "regdist-most-common-toponym", serialize = "region-distribution-most-common-toponym")]
    #[serde(alias = "region-distribution-most-common-toponym")]
    RegdistMostCommonToponym,
}

impl BaselineStrategyName {
    pub fn is_most_common_toponym(&self) -> bool {
        matches!(self, BaselineStrategyName::LinkMostCommonToponym | BaselineStrategyName::RegdistMostCommonToponym)
    }
}

/// The configuration of a run, see the binary for the meaning of the fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeotagConfig {
    pub stopwords_file: Option<PathBuf>,
    pub article_data_file: Vec<PathBuf>,
    pub gazetteer_file: Option<PathBuf>,
    pub counts_file: Vec<PathBuf>,
    pub eval_file: Option<PathBuf>,
    pub eval_format: EvalFormat,
    pub eval_set: Split,

    pub preserve_case_words: bool,
    pub include_stopwords_in_article_dists: bool,
    pub naive_bayes_context_len: usize,
    pub minimum_word_count: u64,

    pub max_dist_for_close_match: f64,
    pub max_dist_for_outliers: f64,

    pub mode: Mode,
    /// Empty means the default of the mode.
    pub strategy: Vec<StrategyName>,
    /// Empty means internal-link.
    pub baseline_strategy: Vec<BaselineStrategyName>,
    pub baseline_weight: f64,
    pub naive_bayes_weighting: NaiveBayesWeighting,
    pub width_of_stat_region: i32,
    pub degrees_per_region: Option<f64>,
    pub miles_per_region: f64,
    pub context_type: ContextType,

    pub kml_words: Vec<String>,
    pub kml_prefix: String,
    pub kml_transform: KmlTransform,

    /// 0 means no limit.
    pub num_training_docs: usize,
    /// 0 means no limit.
    pub num_test_docs: usize,
    pub skip_initial_test_docs: usize,
    pub every_nth_test_doc: usize,
    pub no_individual_results: bool,
    pub oracle_results: bool,
    pub lru_cache_size: usize,
    /// Seconds each reading stage may take, 0 means no limit.
    pub max_time_per_stage: f64,
    /// Seed of the random baselines, random if missing.
    pub seed: Option<u64>,
    /// Writes the articles seen in the word count files to this article data file.
    pub word_count_articles_file: Option<PathBuf>,
}

impl Default for GeotagConfig {
    fn default() -> Self {
        Self {
            stopwords_file: None,
            article_data_file: Vec::new(),
            gazetteer_file: None,
            counts_file: Vec::new(),
            eval_file: None,
            eval_format: EvalFormat::Wiki,
            eval_set: Split::Dev,
            preserve_case_words: false,
            include_stopwords_in_article_dists: false,
            naive_bayes_context_len: 10,
            minimum_word_count: 1,
            max_dist_for_close_match: 80.0,
            max_dist_for_outliers: 200.0,
            mode: Mode::GeotagDocuments,
            strategy: Vec::new(),
            baseline_strategy: Vec::new(),
            baseline_weight: 0.5,
            naive_bayes_weighting: NaiveBayesWeighting::Equal,
            width_of_stat_region: 1,
            degrees_per_region: None,
            miles_per_region: 100.0,
            context_type: ContextType::RegionDistArticleLinks,
            kml_words: Vec::new(),
            kml_prefix: "kml-dist.".to_string(),
            kml_transform: KmlTransform::None,
            num_training_docs: 0,
            num_test_docs: 0,
            skip_initial_test_docs: 0,
            every_nth_test_doc: 1,
            no_individual_results: false,
            oracle_results: false,
            lru_cache_size: 400,
            max_time_per_stage: 0.0,
            seed: None,
            word_count_articles_file: None,
        }
    }
}

impl GeotagConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ConfigError::ConfigFile { path: path.to_path_buf(), source })?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    pub fn max_time(&self) -> Option<Duration> {
        (self.max_time_per_stage > 0.0).then(|| Duration::from_secs_f64(self.max_time_per_stage))
    }

    pub fn num_training_docs(&self) -> Option<usize> {
        (self.num_training_docs > 0).then_some(self.num_training_docs)
    }

    pub fn num_test_docs(&self) -> Option<usize> {
        (self.num_test_docs > 0).then_some(self.num_test_docs)
    }

    pub fn grid(&self) -> Result<RegionGrid, ConfigError> {
        RegionGrid::from_sizes(self.degrees_per_region, self.miles_per_region, self.width_of_stat_region)
    }

    fn only_baseline(&self) -> bool {
        self.strategy == [StrategyName::Baseline]
    }

    /// Fills in the defaults that depend on other options and checks that the
    /// options fit together.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.strategy.is_empty() {
            self.strategy = match self.mode {
                Mode::GeotagDocuments => vec![StrategyName::PartialKlDivergence],
                Mode::GeotagToponyms => vec![StrategyName::Baseline],
                _ => Vec::new(),
            };
        }
        if self.baseline_strategy.is_empty() {
            self.baseline_strategy = vec![BaselineStrategyName::InternalLink];
        }

        if self.strategy.contains(&StrategyName::Baseline) {
            let need_case = self.baseline_strategy.iter().any(BaselineStrategyName::is_most_common_toponym);
            let need_no_case = self.baseline_strategy.iter().any(|b| !b.is_most_common_toponym());
            if need_case {
                if self.strategy.len() > 1 || need_no_case {
                    return Err(ConfigError::Incompatible(
                        "Can't currently mix *-most-common-toponym baseline strategy with other strategies".to_string()
                    ));
                }
                // the toponyms are found by their capitalization
                self.preserve_case_words = true;
            }
        }

        if self.miles_per_region <= 0.0 {
            return Err(ConfigError::InvalidValue("miles-per-region", "must be positive".to_string()));
        }
        if let Some(degrees) = self.degrees_per_region {
            if degrees <= 0.0 {
                return Err(ConfigError::InvalidValue("degrees-per-region", "must be positive".to_string()));
            }
        }
        if self.width_of_stat_region <= 0 {
            return Err(ConfigError::InvalidValue("width-of-stat-region", "must be positive".to_string()));
        }
        if self.every_nth_test_doc == 0 {
            return Err(ConfigError::InvalidValue("every-nth-test-doc", "must be positive".to_string()));
        }

        let geotag = matches!(self.mode, Mode::GeotagDocuments | Mode::GeotagToponyms);
        if geotag && self.counts_file.is_empty() && !(self.mode == Mode::GeotagToponyms && self.only_baseline()) {
            return Err(ConfigError::Missing("counts-file"));
        }

        match self.mode {
            Mode::GeotagToponyms => {
                if self.gazetteer_file.is_none() {
                    return Err(ConfigError::Missing("gazetteer-file"));
                }
                if let Some(baseline) = self.baseline_strategy.iter().find(|b| b.is_most_common_toponym()) {
                    return Err(ConfigError::Incompatible(format!(
                        "--baseline-strategy={baseline} only compatible with --mode=geotag-documents"
                    )));
                }
                if let Some(strategy) = self.strategy.iter().find(|s| {
                    !matches!(s, StrategyName::Baseline | StrategyName::NaiveBayesWithBaseline | StrategyName::NaiveBayesNoBaseline)
                }) {
                    return Err(ConfigError::Incompatible(format!(
                        "Strategy '{strategy}' invalid for --mode=geotag-toponyms"
                    )));
                }
            }
            Mode::GeotagDocuments => {
                if self.eval_format != EvalFormat::Wiki {
                    return Err(ConfigError::Incompatible(
                        "For --mode=geotag-documents, eval-format must be 'wiki'".to_string()
                    ));
                }
            }
            Mode::SegmentGeotagDocuments => {
                return Err(ConfigError::Incompatible(
                    "--mode=segment-geotag-documents is not implemented".to_string()
                ));
            }
            Mode::GenerateKml => {}
        }

        if self.mode == Mode::GeotagToponyms && self.eval_file.is_none() {
            return Err(ConfigError::Missing("eval-file"));
        }

        if self.mode == Mode::GenerateKml {
            if self.kml_words.is_empty() {
                return Err(ConfigError::Missing("kml-words"));
            }
        } else if !self.kml_words.is_empty() {
            return Err(ConfigError::Incompatible("--kml-words only compatible with --mode=generate-kml".to_string()));
        }

        if self.article_data_file.is_empty() {
            return Err(ConfigError::Missing("article-data-file"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::article::Split;
    use crate::config::{BaselineStrategyName, GeotagConfig, Mode, StrategyName};
    use crate::errors::ConfigError;

    fn documents() -> GeotagConfig {
        GeotagConfig {
            article_data_file: vec!["articles.txt".into()],
            counts_file: vec!["counts.txt".into()],
            ..Default::default()
        }
    }

    #[test]
    fn names_and_aliases_parse(){
        assert_eq!(StrategyName::PartialKlDivergence, "partial-kl".parse().unwrap());
        assert_eq!(StrategyName::SymmetricFullKlDivergence, "sym-kldiv".parse().unwrap());
        assert_eq!(StrategyName::AverageCellProbability, "acp".parse().unwrap());
        assert_eq!(StrategyName::NaiveBayesWithBaseline, "nb-base".parse().unwrap());
        assert_eq!("partial-kl-divergence", StrategyName::PartialKlDivergence.to_string());
        assert_eq!(BaselineStrategyName::NumArticles, "numarts".parse().unwrap());
        assert_eq!(BaselineStrategyName::RegdistMostCommonToponym, "region-distribution-most-common-toponym".parse().unwrap());
        assert_eq!(Mode::GenerateKml, "generate-kml".parse().unwrap());
        assert!("regdist".parse::<StrategyName>().is_err());
    }

    #[test]
    fn defaults_depend_on_mode(){
        let mut config = documents();
        config.validate().unwrap();
        assert_eq!(vec![StrategyName::PartialKlDivergence], config.strategy);
        assert_eq!(vec![BaselineStrategyName::InternalLink], config.baseline_strategy);
        assert_eq!(Split::Dev, config.eval_set);

        let mut config = GeotagConfig {
            mode: Mode::GeotagToponyms,
            counts_file: Vec::new(),
            gazetteer_file: Some("gazetteer.txt".into()),
            eval_file: Some("eval".into()),
            ..documents()
        };
        config.validate().unwrap();
        assert_eq!(vec![StrategyName::Baseline], config.strategy);
    }

    #[test]
    fn most_common_toponym_sets_case(){
        let mut config = GeotagConfig {
            strategy: vec![StrategyName::Baseline],
            baseline_strategy: vec![BaselineStrategyName::LinkMostCommonToponym],
            ..documents()
        };
        config.validate().unwrap();
        assert!(config.preserve_case_words);

        let mut mixed = GeotagConfig {
            strategy: vec![StrategyName::Baseline],
            baseline_strategy: vec![BaselineStrategyName::LinkMostCommonToponym, BaselineStrategyName::Random],
            ..documents()
        };
        assert!(matches!(mixed.validate(), Err(ConfigError::Incompatible(_))));
    }

    #[test]
    fn invalid_combinations_are_rejected(){
        let mut config = GeotagConfig { counts_file: Vec::new(), ..documents() };
        assert!(matches!(config.validate(), Err(ConfigError::Missing("counts-file"))));

        let mut config = GeotagConfig { miles_per_region: 0.0, ..documents() };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(..))));

        let mut config = GeotagConfig {
            mode: Mode::GeotagToponyms,
            strategy: vec![StrategyName::PartialKlDivergence],
            gazetteer_file: Some("gazetteer.txt".into()),
            eval_file: Some("eval".into()),
            ..documents()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Incompatible(_))));

        let mut config = GeotagConfig { kml_words: vec!["paris".to_string()], ..documents() };
        assert!(matches!(config.validate(), Err(ConfigError::Incompatible(_))));

        let mut config = GeotagConfig { mode: Mode::GenerateKml, ..documents() };
        assert!(matches!(config.validate(), Err(ConfigError::Missing("kml-words"))));

        let mut config = GeotagConfig { article_data_file: Vec::new(), ..documents() };
        assert!(matches!(config.validate(), Err(ConfigError::Missing("article-data-file"))));
    }

    #[test]
    fn json_round_trip(){
        let mut file = tempfile::NamedTempFile::new().unwrap();
        serde_json::to_writer(&mut file, &documents()).unwrap();
        let read = GeotagConfig::from_json_file(file.path()).unwrap();
        assert_eq!(documents(), read);

        let partial: GeotagConfig = serde_json::from_str(r#"{"mode": "generate-kml", "strategy": ["acp"], "eval_set": "test"}"#).unwrap();
        assert_eq!(Mode::GenerateKml, partial.mode);
        assert_eq!(vec![StrategyName::AverageCellProbability], partial.strategy);
        assert_eq!(Split::Test, partial.eval_set);
        assert_eq!(400, partial.lru_cache_size);
    }
}
