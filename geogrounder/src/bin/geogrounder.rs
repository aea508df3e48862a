use std::process::ExitCode;
use camino::Utf8PathBuf;
use clap::Parser;
use env_logger::Target;
use log::LevelFilter;
use geogrounder::article::Split;
use geogrounder::config::{BaselineStrategyName, ContextType, EvalFormat, GeotagConfig, Mode, NaiveBayesWeighting, StrategyName};
use geogrounder::errors::GeotagError;
use geogrounder::kml::KmlTransform;
use geogrounder::{init_logging, run};

/// Resolves toponyms and geotags documents with word distributions of
/// Wikipedia articles.
///
/// Flags override the values of `--config`.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON file with the configuration.
    #[arg(long)]
    config: Option<Utf8PathBuf>,

    /// Log debug output.
    #[arg(short, long)]
    verbose: bool,

    /// File with one stopword per line.
    #[arg(long)]
    stopwords_file: Option<Utf8PathBuf>,

    /// Article data file, can be given multiple times.
    #[arg(long)]
    article_data_file: Vec<Utf8PathBuf>,

    /// World gazetteer, needed for geotag-toponyms.
    #[arg(long)]
    gazetteer_file: Option<Utf8PathBuf>,

    /// File of word counts per article, can be given multiple times.
    #[arg(long)]
    counts_file: Vec<Utf8PathBuf>,

    /// Evaluation file or directory of evaluation files.
    #[arg(short, long)]
    eval_file: Option<Utf8PathBuf>,

    /// Format of the evaluation files: wiki or tr-conll.
    #[arg(short = 'f', long)]
    eval_format: Option<EvalFormat>,

    /// Split of the articles evaluated in geotag-documents: training, dev or test.
    #[arg(long)]
    eval_set: Option<Split>,

    /// Keep the case of the words in the word counts.
    #[arg(long)]
    preserve_case_words: bool,

    /// Keep stopwords in the distributions of the articles.
    #[arg(long)]
    include_stopwords_in_article_dists: bool,

    /// Words on either side of a toponym used as its context.
    #[arg(long)]
    naive_bayes_context_len: Option<usize>,

    /// Words seen less often in the training articles are unknown.
    #[arg(long)]
    minimum_word_count: Option<u64>,

    /// Miles a gazetteer entry may be away from an article to match it.
    #[arg(long)]
    max_dist_for_close_match: Option<f64>,

    /// Miles a locality may be away from the others of its division.
    #[arg(long)]
    max_dist_for_outliers: Option<f64>,

    /// geotag-toponyms, geotag-documents or generate-kml.
    #[arg(short, long)]
    mode: Option<Mode>,

    /// Strategy to evaluate, can be given multiple times.
    #[arg(short, long, value_delimiter = ',')]
    strategy: Vec<StrategyName>,

    /// Baseline for the baseline strategy, can be given multiple times.
    #[arg(long, value_delimiter = ',')]
    baseline_strategy: Vec<BaselineStrategyName>,

    /// Weight of the baseline in the naive bayes strategies.
    #[arg(long)]
    baseline_weight: Option<f64>,

    /// equal, equal-words or distance-weighted.
    #[arg(long)]
    naive_bayes_weighting: Option<NaiveBayesWeighting>,

    /// Tiling regions per side of a statistical region.
    #[arg(long)]
    width_of_stat_region: Option<i32>,

    /// Size of a tiling region in degrees, takes precedence over miles.
    #[arg(long)]
    degrees_per_region: Option<f64>,

    /// Size of a tiling region in miles.
    #[arg(long)]
    miles_per_region: Option<f64>,

    /// Distribution a toponym candidate is scored against: article, region
    /// or region-dist-article-links.
    #[arg(long)]
    context_type: Option<ContextType>,

    /// Words to write a KML file for.
    #[arg(long, value_delimiter = ',')]
    kml_words: Vec<String>,

    /// Prefix of the KML files.
    #[arg(long)]
    kml_prefix: Option<String>,

    /// Transformation of the probabilities in the KML files: none, log or logsquared.
    #[arg(long)]
    kml_transform: Option<KmlTransform>,

    /// Training documents to read, 0 for all.
    #[arg(long)]
    num_training_docs: Option<usize>,

    /// Test documents to evaluate, 0 for all.
    #[arg(long)]
    num_test_docs: Option<usize>,

    #[arg(long)]
    skip_initial_test_docs: Option<usize>,

    /// Evaluate only every n-th test document.
    #[arg(long)]
    every_nth_test_doc: Option<usize>,

    /// Do not log the result of each document.
    #[arg(long)]
    no_individual_results: bool,

    /// Rank the true region first, for the best possible error distances.
    #[arg(long)]
    oracle_results: bool,

    /// Region distributions of words kept in memory.
    #[arg(long)]
    lru_cache_size: Option<usize>,

    /// Seconds each reading stage may take, 0 for no limit.
    #[arg(long)]
    max_time_per_stage: Option<f64>,

    /// Seed for the random baselines.
    #[arg(long)]
    seed: Option<u64>,

    /// Write the articles seen in the word counts to this article data file.
    #[arg(long)]
    word_count_articles_file: Option<Utf8PathBuf>,
}

impl Args {
    fn into_config(self) -> Result<GeotagConfig, GeotagError> {
        let mut config = match self.config {
            Some(ref path) => GeotagConfig::from_json_file(path)?,
            None => GeotagConfig::default(),
        };

        macro_rules! set {
            ($($field: ident),+ $(,)?) => {
                $(if let Some(value) = self.$field {
                    config.$field = value.into();
                })+
            };
        }
        macro_rules! extend {
            ($($field: ident),+ $(,)?) => {
                $(if !self.$field.is_empty() {
                    config.$field = self.$field.into_iter().map(Into::into).collect();
                })+
            };
        }
        macro_rules! flag {
            ($($field: ident),+ $(,)?) => {
                $(config.$field |= self.$field;)+
            };
        }

        set!(
            eval_format, eval_set, naive_bayes_context_len, minimum_word_count,
            max_dist_for_close_match, max_dist_for_outliers, mode, baseline_weight,
            naive_bayes_weighting, width_of_stat_region, miles_per_region, context_type,
            kml_prefix, kml_transform, num_training_docs, num_test_docs,
            skip_initial_test_docs, every_nth_test_doc, lru_cache_size, max_time_per_stage,
        );
        extend!(article_data_file, counts_file, strategy, baseline_strategy, kml_words);
        flag!(preserve_case_words, include_stopwords_in_article_dists, no_individual_results, oracle_results);

        if let Some(path) = self.stopwords_file {
            config.stopwords_file = Some(path.into());
        }
        if let Some(path) = self.gazetteer_file {
            config.gazetteer_file = Some(path.into());
        }
        if let Some(path) = self.eval_file {
            config.eval_file = Some(path.into());
        }
        if let Some(path) = self.word_count_articles_file {
            config.word_count_articles_file = Some(path.into());
        }
        if self.degrees_per_region.is_some() {
            config.degrees_per_region = self.degrees_per_region;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(if args.verbose { LevelFilter::Debug } else { LevelFilter::Info }, Target::Stdout);
    match args.into_config().and_then(run) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
