//! Loading of the stopwords, the article data and the word counts into the tables.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;
use arcstr::ArcStr;
use regex::Regex;
use geogrounder_toolkit::status::StatusMessage;
use geogrounder_worddist::{CorpusStatistics, Word, WordDist, WordDistError};
use crate::article::io::{read_article_data_file, ArticleDataWriter, ArticleField};
use crate::article::table::ArticleTable;
use crate::article::Split;
use crate::config::GeotagConfig;
use crate::errors::{GeotagError, ReadError};
use crate::region::StatRegionTable;

fn open(path: &Path) -> Result<BufReader<File>, ReadError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| ReadError::Open { path: path.to_path_buf(), source })
}

/// One stopword per line.
pub fn read_stopwords(path: impl AsRef<Path>) -> Result<HashSet<String>, ReadError> {
    let path = path.as_ref();
    log::info!("Reading stopwords from {}...", path.display());
    let mut stopwords = HashSet::new();
    for line in open(path)?.lines() {
        stopwords.insert(line?);
    }
    Ok(stopwords)
}

/// Reads the articles of the `Main` namespace. Articles with a coordinate are
/// recorded and put into their tiling region, redirects are recorded for their
/// target once the whole file is read.
pub fn read_article_data(
    path: impl AsRef<Path>,
    articles: &mut ArticleTable,
    regions: &mut StatRegionTable,
    config: &GeotagConfig,
) -> Result<(), ReadError> {
    let mut redirects = Vec::new();
    read_article_data_file(path, config.max_time(), |art| {
        if art.namespace != "Main" {
            return;
        }
        if art.is_redirect() {
            redirects.push(art);
        } else if let Some(coord) = art.coord {
            let id = articles.insert(art);
            articles.record_own_article(id);
            regions.add_article_to_region(id, &coord);
        }
    })?;
    for redirect in redirects {
        if let Some(target) = articles.lookup_article(&redirect.redir) {
            articles.record_redirect(&redirect, target);
        }
    }
    Ok(())
}

static TITLE_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^Article title: (.*)$").unwrap());
static COUNT_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.*) = ([0-9]+)$").unwrap());

/// The counts of the article currently read.
struct PendingArticle {
    title: String,
    counts: HashMap<Word, u64>,
    total_tokens: u64,
}

/// Reads a word count file and sets the distributions of the articles in it.
///
/// Only training articles and articles of the evaluation split keep their
/// distribution, only training articles go into the corpus statistics.
pub fn read_word_counts(
    path: impl AsRef<Path>,
    articles: &mut ArticleTable,
    stats: &mut CorpusStatistics,
    stopwords: &HashSet<String>,
    config: &GeotagConfig,
    mut word_count_articles: Option<&mut ArticleDataWriter<File>>,
) -> Result<(), GeotagError> {
    let path = path.as_ref();
    log::info!("Reading word counts from {}...", path.display());
    let mut status = StatusMessage::new("article").with_max_time(config.max_time());

    let mut finish_article = |pending: PendingArticle, articles: &mut ArticleTable, stats: &mut CorpusStatistics| -> Result<(), GeotagError> {
        if pending.total_tokens == 0 {
            return Ok(());
        }
        let Some(id) = articles.lookup_article(&pending.title) else {
            log::warn!("Skipping article {}, not in table", pending.title);
            articles.num_articles_with_word_counts_but_not_in_table += 1;
            return Ok(());
        };
        if let Some(writer) = word_count_articles.as_mut() {
            writer.write_article(articles.get(id))?;
        }
        let split = articles.get(id).split;
        *articles.num_word_count_articles_by_split.entry(split).or_default() += 1;
        // the other evaluation split is never needed
        if split != Split::Training && split != config.eval_set {
            return Ok(());
        }
        let mut dist = WordDist::new();
        dist.set_word_distribution(stats, pending.total_tokens, pending.counts, split == Split::Training)?;
        articles.get_mut(id).dist = Some(dist);
        Ok(())
    };

    let mut pending: Option<PendingArticle> = None;
    for line in open(path)?.lines() {
        let line = line.map_err(ReadError::from)?;
        if let Some(caps) = TITLE_LINE.captures(&line) {
            if let Some(done) = pending.take() {
                finish_article(done, articles, stats)?;
            }
            if let Some(limit) = config.num_training_docs() {
                if status.num_processed() >= limit {
                    log::info!("Finishing reading word counts after {} documents", status.num_processed());
                    break;
                }
            }
            if status.item_processed() {
                break;
            }
            pending = Some(PendingArticle {
                title: caps[1].to_string(),
                counts: HashMap::new(),
                total_tokens: 0,
            });
        } else if line.starts_with("Article coordinates: ") || line.starts_with("Article ID: ") {
            continue;
        } else {
            let Some(caps) = COUNT_LINE.captures(&line) else {
                log::warn!(
                    "Strange line, can't parse: title={}: line={line}",
                    pending.as_ref().map_or("", |p| p.title.as_str())
                );
                continue;
            };
            let word = if config.preserve_case_words { caps[1].to_string() } else { caps[1].to_lowercase() };
            let Ok(count) = caps[2].parse::<u64>() else {
                log::warn!("Count out of range in line={line}");
                continue;
            };
            if !config.include_stopwords_in_article_dists && stopwords.contains(&word) {
                continue;
            }
            match pending.as_mut() {
                Some(current) => {
                    current.total_tokens += count;
                    *current.counts.entry(ArcStr::from(word)).or_default() += count;
                }
                None => log::warn!("Saw word count before any article title: line={line}"),
            }
        }
    }
    if let Some(done) = pending.take() {
        finish_article(done, articles, stats)?;
    }
    log::info!("Finished reading distributions from {} articles.", status.num_processed());
    articles.num_articles_with_word_counts = status.num_processed();
    Ok(())
}

/// Finishes the corpus statistics and every article distribution and logs the
/// counts of each split.
pub fn finish_word_counts(articles: &mut ArticleTable, stats: &mut CorpusStatistics, minimum_word_count: u64) -> Result<(), WordDistError> {
    stats.finish_global_distribution();
    articles.finish_article_distributions(stats, minimum_word_count)?;
    log::info!("-------------------------------------------------------------------------");
    log::info!("Article count statistics:");
    let mut total_arts_in_table = 0;
    let mut total_arts_with_word_counts = 0;
    let mut total_arts_with_dists = 0;
    for (split, total_tokens) in articles.word_tokens_by_split.iter() {
        let arts_in_table = articles.articles_in_split(*split).len();
        let arts_with_word_counts = articles.num_word_count_articles_by_split.get(split).copied().unwrap_or(0);
        let arts_with_dists = articles.num_dist_articles_by_split.get(split).copied().unwrap_or(0);
        total_arts_in_table += arts_in_table;
        total_arts_with_word_counts += arts_with_word_counts;
        total_arts_with_dists += arts_with_dists;
        log::info!("For split '{split}':");
        log::info!("  {arts_in_table} articles in article table");
        log::info!("  {arts_with_word_counts} articles with word counts seen (and in table)");
        log::info!(
            "  {arts_with_dists} articles with distribution computed, {total_tokens} total tokens, {:.2} tokens/article",
            *total_tokens as f64 / (arts_in_table as f64 + 1e-100)
        );
    }
    log::info!("Total: {} articles with word counts seen", articles.num_articles_with_word_counts);
    log::info!("Total: {total_arts_in_table} articles in article table");
    log::info!(
        "Total: {} articles with word counts seen but not in article table",
        articles.num_articles_with_word_counts_but_not_in_table
    );
    log::info!("Total: {total_arts_with_word_counts} articles with word counts seen (and in table)");
    log::info!("Total: {total_arts_with_dists} articles with distribution computed");
    Ok(())
}

/// Creates the writer for [GeotagConfig::word_count_articles_file].
pub fn word_count_articles_writer(config: &GeotagConfig) -> Result<Option<ArticleDataWriter<File>>, ReadError> {
    let Some(ref path) = config.word_count_articles_file else {
        return Ok(None);
    };
    let file = File::create(path).map_err(|source| ReadError::Open { path: path.clone(), source })?;
    Ok(Some(ArticleDataWriter::new(file, ArticleField::combined())?))
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;
    use std::io::Write;
    use geogrounder_worddist::CorpusStatistics;
    use crate::article::io::{write_article_data_file, ArticleField};
    use crate::article::table::ArticleTable;
    use crate::article::{Article, Split};
    use crate::config::GeotagConfig;
    use crate::coord::Coord;
    use crate::grid::RegionGrid;
    use crate::readers::{finish_word_counts, read_article_data, read_stopwords, read_word_counts};
    use crate::region::StatRegionTable;

    fn article(title: &str, split: Split, coord: Option<Coord>, redir: &str, namespace: &str) -> Article {
        Article {
            title: title.to_string(),
            split,
            coord,
            incoming_links: Some(5),
            redir: redir.to_string(),
            namespace: namespace.to_string(),
            ..Default::default()
        }
    }

    fn setup(dir: &std::path::Path) -> (ArticleTable, StatRegionTable) {
        let path = dir.join("articles.txt");
        write_article_data_file(&path, ArticleField::combined(), &[
            article("Paris", Split::Training, Some(Coord::new(48.86, 2.35)), "", "Main"),
            article("Lyon", Split::Dev, Some(Coord::new(45.76, 4.84)), "", "Main"),
            article("Nice", Split::Test, Some(Coord::new(43.7, 7.27)), "", "Main"),
            article("Paname", Split::Training, None, "Paris", "Main"),
            article("Nowhere", Split::Training, None, "", "Main"),
            article("Talk:Paris", Split::Training, Some(Coord::new(48.86, 2.35)), "", "Talk"),
        ]).unwrap();
        let mut articles = ArticleTable::new();
        let mut regions = StatRegionTable::new(RegionGrid::new(5.0, 1).unwrap(), 1, true);
        read_article_data(&path, &mut articles, &mut regions, &GeotagConfig::default()).unwrap();
        (articles, regions)
    }

    #[test]
    fn article_data_is_recorded(){
        let dir = tempfile::tempdir().unwrap();
        let (articles, regions) = setup(dir.path());
        assert_eq!(3, articles.len());
        let paris = articles.lookup_article("Paris").unwrap();
        assert_eq!(Some(paris), articles.lookup_article("Paname"));
        assert_eq!(Some(10), articles.get(paris).incoming_links);
        assert_eq!(None, articles.lookup_article("Nowhere"));
        assert_eq!(None, articles.lookup_article("Talk:Paris"));
        assert!(regions.is_nonempty_tiling_region(&(9, 0)));
    }

    #[test]
    fn word_counts_fill_distributions(){
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempfile::tempdir().unwrap();
        let (mut articles, _) = setup(dir.path());

        let stopwords_path = dir.path().join("stopwords.txt");
        std::fs::write(&stopwords_path, "the\nof\n").unwrap();
        let stopwords: HashSet<String> = read_stopwords(&stopwords_path).unwrap();
        assert_eq!(2, stopwords.len());

        let counts_path = dir.path().join("counts.txt");
        let mut file = std::fs::File::create(&counts_path).unwrap();
        writeln!(file, "Article title: Paris").unwrap();
        writeln!(file, "Article ID: 1").unwrap();
        writeln!(file, "Article coordinates: 48.86,2.35").unwrap();
        writeln!(file, "Seine = 3").unwrap();
        writeln!(file, "the = 10").unwrap();
        writeln!(file, "france = 2").unwrap();
        writeln!(file, "this line is broken").unwrap();
        writeln!(file, "Article title: Lyon").unwrap();
        writeln!(file, "rhone = 4").unwrap();
        writeln!(file, "Article title: Nice").unwrap();
        writeln!(file, "riviera = 4").unwrap();
        writeln!(file, "Article title: Marseille").unwrap();
        writeln!(file, "port = 1").unwrap();
        drop(file);

        let mut stats = CorpusStatistics::new();
        let config = GeotagConfig::default();
        read_word_counts(&counts_path, &mut articles, &mut stats, &stopwords, &config, None).unwrap();
        assert_eq!(4, articles.num_articles_with_word_counts);
        assert_eq!(1, articles.num_articles_with_word_counts_but_not_in_table);
        assert_eq!(Some(&1), articles.num_word_count_articles_by_split.get(&Split::Test));

        let paris = articles.lookup_article("Paris").unwrap();
        let dist = articles.get(paris).dist.as_ref().unwrap();
        assert_eq!(5, dist.total_tokens());
        assert_eq!(Some(3), dist.count("seine"));
        assert_eq!(None, dist.count("the"));
        let nice = articles.lookup_article("Nice").unwrap();
        assert!(articles.get(nice).dist.is_none());
        let lyon = articles.lookup_article("Lyon").unwrap();
        assert!(articles.get(lyon).dist.is_some());
        // only training words are counted globally
        assert_eq!(None, stats.global_count("rhone"));

        finish_word_counts(&mut articles, &mut stats, 1).unwrap();
        assert!(stats.is_finished());
        assert!(articles.get(lyon).dist.as_ref().unwrap().is_finished());
        assert_eq!(Some(&5), articles.word_tokens_by_split.get(&Split::Training));
        assert_eq!(Some(&1), articles.num_dist_articles_by_split.get(&Split::Dev));
    }

    #[test]
    fn training_limit_stops_reading(){
        let dir = tempfile::tempdir().unwrap();
        let (mut articles, _) = setup(dir.path());
        let counts_path = dir.path().join("counts.txt");
        std::fs::write(&counts_path, "Article title: Paris\nseine = 3\nArticle title: Lyon\nrhone = 4\n").unwrap();
        let config = GeotagConfig { num_training_docs: 1, preserve_case_words: true, ..Default::default() };
        let mut stats = CorpusStatistics::new();
        read_word_counts(&counts_path, &mut articles, &mut stats, &HashSet::new(), &config, None).unwrap();
        let lyon = articles.lookup_article("Lyon").unwrap();
        assert!(articles.get(lyon).dist.is_none());
        let paris = articles.lookup_article("Paris").unwrap();
        assert!(articles.get(paris).dist.is_some());
        // the limit is the number of articles read
        assert_eq!(1, articles.num_articles_with_word_counts);
    }
}
