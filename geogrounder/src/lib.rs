use camino::{Utf8Path, Utf8PathBuf};
use env_logger::Target;
use log::LevelFilter;
use crate::config::{BaselineStrategyName, GeotagConfig, Mode, StrategyName};
use crate::context::GeoContext;
use crate::errors::{ConfigError, GeotagError, ReadError};
use crate::evaluator::{evaluate_and_output_results, GeotagToponymEvaluator, WikipediaDocumentEvaluator};
use crate::strategy::{DocumentStrategy, ToponymStrategy};

pub mod article;
pub mod boundary;
pub mod combine;
pub mod config;
pub mod context;
pub mod coord;
pub mod errors;
pub mod eval;
pub mod evaluator;
pub mod gazetteer;
pub mod grid;
pub mod kml;
pub mod readers;
pub mod region;
pub mod region_dist;
pub mod strategy;

/// `RUST_LOG` overrides the level.
pub fn init_logging(level: LevelFilter, target: Target) {
    let _ = env_logger::builder()
        .target(target)
        .filter_level(level)
        .parse_default_env()
        .try_init();
}

/// The files of a directory, or the path itself if it is a file.
fn iter_directory_files(path: &Utf8Path) -> Result<Vec<Utf8PathBuf>, ReadError> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let open_error = |source: std::io::Error| ReadError::Open { path: path.as_std_path().to_path_buf(), source };
    let mut files = Vec::new();
    for entry in path.read_dir_utf8().map_err(open_error)? {
        files.push(entry.map_err(open_error)?.into_path());
    }
    files.sort();
    Ok(files)
}

/// Every strategy of the config with its name, a baseline strategy once per
/// baseline.
fn strategy_names(config: &GeotagConfig) -> Vec<(String, StrategyName, BaselineStrategyName)> {
    let mut names = Vec::new();
    for &name in &config.strategy {
        if name == StrategyName::Baseline {
            for &baseline in &config.baseline_strategy {
                names.push((format!("baseline {baseline}"), name, baseline));
            }
        } else if name != StrategyName::None {
            names.push((name.to_string(), name, BaselineStrategyName::default()));
        }
    }
    names
}

fn generate_kml_files(ctx: &GeoContext) -> Result<(), GeotagError> {
    let config = &ctx.config;
    for word in &config.kml_words {
        let dist = ctx.region_dist_for_word(&word.as_str().into());
        if !dist.normalized {
            log::warn!("Non-normalized distribution, apparently word {word} not seen anywhere.");
            log::warn!("Not generating an empty KML file.");
            continue;
        }
        let path = format!("{}{word}.kml", config.kml_prefix);
        log::info!("Writing {path}...");
        kml::write_kml_file(&path, &dist, &ctx.regions, &ctx.articles, config.kml_transform)?;
    }
    Ok(())
}

fn geotag_toponyms(ctx: &GeoContext) -> Result<(), GeotagError> {
    let config = &ctx.config;
    let eval_file = config.eval_file.as_ref().ok_or(ConfigError::Missing("eval-file"))?;
    let eval_file = Utf8PathBuf::from_path_buf(eval_file.clone())
        .map_err(|path| ConfigError::InvalidValue("eval-file", path.to_string_lossy().into_owned()))?;
    log::info!("Processing evaluation file/dir {eval_file}...");
    let files = iter_directory_files(&eval_file)?;
    for (name, strategy, baseline) in strategy_names(config) {
        let strategy = ToponymStrategy::from_name(strategy, baseline, config.seed)?;
        let mut evaluator = GeotagToponymEvaluator::new(strategy, name, config.eval_format);
        evaluate_and_output_results(&mut evaluator, ctx, files.iter().cloned())?;
    }
    Ok(())
}

fn geotag_documents(ctx: &GeoContext) -> Result<(), GeotagError> {
    let config = &ctx.config;
    for (name, strategy, baseline) in strategy_names(config) {
        let Some(strategy) = DocumentStrategy::from_name(strategy, baseline, config.seed) else {
            continue;
        };
        let mut evaluator = WikipediaDocumentEvaluator::new(strategy, name, ctx.grid().clone());
        evaluate_and_output_results(&mut evaluator, ctx, [config.eval_set])?;
    }
    Ok(())
}

/// Validates the config, reads the tables and runs the mode of the config.
pub fn run(mut config: GeotagConfig) -> Result<(), GeotagError> {
    config.validate()?;
    let ctx = GeoContext::load(config)?;
    match ctx.config.mode {
        Mode::GenerateKml => generate_kml_files(&ctx),
        Mode::GeotagToponyms => geotag_toponyms(&ctx),
        Mode::GeotagDocuments => geotag_documents(&ctx),
        Mode::SegmentGeotagDocuments => Err(ConfigError::Incompatible(
            "--mode=segment-geotag-documents is not implemented".to_string()
        ).into()),
    }
}

#[cfg(test)]
mod test {
    use std::path::Path;
    use tempfile::TempDir;
    use crate::article::io::{write_article_data_file, ArticleField};
    use crate::article::{Article, Split};
    use crate::config::{BaselineStrategyName, GeotagConfig, Mode, StrategyName};
    use crate::context::GeoContext;
    use crate::coord::Coord;
    use crate::{run, strategy_names};

    const COUNTS: &str = "Article title: Paris
Article ID: 1
paris = 10
france = 6
eiffel = 3
Article title: Lyon
lyon = 8
france = 5
rhone = 4
Article title: Berlin
Article coordinates: 52.52,13.4
berlin = 10
germany = 7
wall = 3
Article title: Tucson
tucson = 6
arizona = 5
desert = 4
Article title: Eiffel Tower
eiffel = 4
paris = 3
france = 1
";

    /// Four training articles and one dev article, with their word counts.
    fn pipeline_files(dir: &Path) -> GeotagConfig {
        let places = [
            ("Paris", 48.86, 2.35, 1000, Split::Training),
            ("Lyon", 45.76, 4.84, 400, Split::Training),
            ("Berlin", 52.52, 13.4, 900, Split::Training),
            ("Tucson", 32.22, -110.93, 300, Split::Training),
            ("Eiffel Tower", 48.858, 2.294, 500, Split::Dev),
        ];
        let articles = places.iter().enumerate().map(|(i, (title, lat, long, links, split))| Article {
            title: title.to_string(),
            id: i as i64 + 1,
            coord: Some(Coord::new(*lat, *long)),
            incoming_links: Some(*links),
            split: *split,
            ..Default::default()
        }).collect::<Vec<_>>();
        let article_data = dir.join("articles.txt");
        write_article_data_file(&article_data, ArticleField::combined(), &articles).unwrap();
        let counts = dir.join("counts.txt");
        std::fs::write(&counts, COUNTS).unwrap();
        GeotagConfig {
            article_data_file: vec![article_data],
            counts_file: vec![counts],
            degrees_per_region: Some(5.0),
            ..Default::default()
        }
    }

    #[test]
    fn loading_keeps_only_the_evaluated_distributions(){
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = TempDir::new().unwrap();
        let mut config = pipeline_files(dir.path());
        config.validate().unwrap();
        let ctx = GeoContext::load(config).unwrap();
        assert_eq!(5, ctx.articles.len());
        assert!(ctx.stats.is_finished());
        assert!(ctx.regions.all_regions_computed());
        assert_eq!(4, ctx.regions.total_num_arts_for_word_dist());
        let paris = ctx.articles.lookup_article("Paris").unwrap();
        assert!(ctx.articles.get(paris).dist.is_none());
        let tower = ctx.articles.lookup_article("Eiffel Tower").unwrap();
        assert!(ctx.articles.get(tower).dist.as_ref().is_some_and(|dist| dist.is_finished()));
    }

    #[test]
    fn documents_are_geotagged_and_kml_is_written(){
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = TempDir::new().unwrap();
        let config = pipeline_files(dir.path());

        run(GeotagConfig {
            mode: Mode::GeotagDocuments,
            strategy: vec![StrategyName::PartialKlDivergence, StrategyName::Baseline],
            ..config.clone()
        }).unwrap();

        let prefix = format!("{}/kml-", dir.path().display());
        run(GeotagConfig {
            mode: Mode::GenerateKml,
            kml_words: vec!["france".to_string(), "zzzneverseen".to_string()],
            kml_prefix: prefix.clone(),
            ..config.clone()
        }).unwrap();
        let kml = std::fs::read_to_string(format!("{prefix}france.kml")).unwrap();
        assert!(kml.contains("<kml"));
        assert!(!Path::new(&format!("{prefix}zzzneverseen.kml")).exists());

        assert!(run(GeotagConfig { mode: Mode::SegmentGeotagDocuments, ..config }).is_err());
    }

    #[test]
    fn baselines_are_expanded(){
        let config = GeotagConfig {
            strategy: vec![StrategyName::Baseline, StrategyName::None, StrategyName::PartialKlDivergence],
            baseline_strategy: vec![BaselineStrategyName::InternalLink, BaselineStrategyName::Random],
            ..Default::default()
        };
        let names = strategy_names(&config).into_iter().map(|(name, _, _)| name).collect::<Vec<_>>();
        assert_eq!(vec!["baseline internal-link", "baseline random", "partial-kl-divergence"], names);
    }
}
