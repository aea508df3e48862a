use std::io::stdout;
use std::process::ExitCode;
use std::time::Duration;
use camino::Utf8PathBuf;
use clap::Parser;
use env_logger::Target;
use log::LevelFilter;
use geogrounder::article::io::{ArticleDataWriter, ArticleField};
use geogrounder::combine::{combine_article_data, SplitOptions};
use geogrounder::errors::GeotagError;
use geogrounder::init_logging;

/// Joins article data, coordinates and incoming links into one article data
/// file with splits, written to stdout.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Article data file as extracted from the dump.
    #[arg(short, long)]
    article_data_file: Utf8PathBuf,

    /// File of `Article title:` and `Article coordinates:` lines.
    #[arg(short, long)]
    coords_file: Utf8PathBuf,

    /// File of `title = count` incoming link lines.
    #[arg(short, long)]
    links_file: Utf8PathBuf,

    #[arg(long, default_value_t = 80.0)]
    training_fraction: f64,
    #[arg(long, default_value_t = 10.0)]
    dev_fraction: f64,
    #[arg(long, default_value_t = 10.0)]
    test_fraction: f64,

    /// Maximum number of training articles, 0 for no maximum.
    #[arg(long, default_value_t = 0)]
    max_training_size: usize,
    #[arg(long, default_value_t = 10000)]
    max_dev_size: usize,
    #[arg(long, default_value_t = 10000)]
    max_test_size: usize,

    /// Seconds each reading stage may take, 0 for no limit.
    #[arg(long, default_value_t = 0.0)]
    max_time_per_stage: f64,
}

fn combine(args: Args) -> Result<(), GeotagError> {
    let splits = SplitOptions {
        training_fraction: args.training_fraction,
        dev_fraction: args.dev_fraction,
        test_fraction: args.test_fraction,
        max_training_size: args.max_training_size,
        max_dev_size: args.max_dev_size,
        max_test_size: args.max_test_size,
    };
    let max_time = (args.max_time_per_stage > 0.0).then(|| Duration::from_secs_f64(args.max_time_per_stage));
    let articles = combine_article_data(&args.article_data_file, &args.coords_file, &args.links_file, &splits, max_time)?;
    let mut writer = ArticleDataWriter::new(stdout().lock(), ArticleField::combined())?;
    for art in &articles {
        writer.write_article(art)?;
    }
    writer.flush()?;
    Ok(())
}

fn main() -> ExitCode {
    // the articles go to stdout
    init_logging(LevelFilter::Info, Target::Stderr);
    match combine(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
