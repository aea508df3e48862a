//! Joins an article data file with the coordinates and the incoming links found
//! in separate passes over a dump, keeping only the articles with a coordinate,
//! and assigns every article to a split.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;
use regex::Regex;
use serde::{Deserialize, Serialize};
use geogrounder_toolkit::splits::next_split_set;
use geogrounder_toolkit::status::StatusMessage;
use geogrounder_toolkit::text::capfirst;
use crate::article::io::read_article_data_file;
use crate::article::{Article, Split};
use crate::coord::Coord;
use crate::errors::{GeotagError, ReadError};

const LINKS_HEADER: &str = "------------------ Count of incoming links: ------------";
const LINKS_FOOTER: &str = "==========================================";

static TITLE_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^Article title: (.*)$").unwrap());
static COORD_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^Article coordinates: (.*),(.*)$").unwrap());
static LINK_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.*) = ([0-9]+)$").unwrap());

/// The proportions and maximum sizes of the training, dev and test splits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitOptions {
    pub training_fraction: f64,
    pub dev_fraction: f64,
    pub test_fraction: f64,
    /// 0 means no maximum.
    pub max_training_size: usize,
    pub max_dev_size: usize,
    pub max_test_size: usize,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            training_fraction: 80.0,
            dev_fraction: 10.0,
            test_fraction: 10.0,
            max_training_size: 0,
            max_dev_size: 10000,
            max_test_size: 10000,
        }
    }
}

fn open(path: &Path) -> Result<BufReader<File>, ReadError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| ReadError::Open { path: path.to_path_buf(), source })
}

/// Reads `Article title:` and `Article coordinates: lat,long` line pairs.
pub fn read_coordinates_file(path: impl AsRef<Path>, max_time: Option<Duration>) -> Result<HashMap<String, Coord>, ReadError> {
    let path = path.as_ref();
    log::info!("Reading article coordinates from {}...", path.display());
    let mut status = StatusMessage::new("article").with_max_time(max_time);
    let mut coords = HashMap::new();
    let mut title: Option<String> = None;
    for line in open(path)?.lines() {
        let line = line?;
        if let Some(caps) = TITLE_LINE.captures(&line) {
            title = Some(caps[1].to_string());
        } else if let Some(caps) = COORD_LINE.captures(&line) {
            let (Ok(lat), Ok(long)) = (caps[1].trim().parse::<f64>(), caps[2].trim().parse::<f64>()) else {
                log::warn!("Skipping unparsable coordinates: line={line}");
                continue;
            };
            match title {
                Some(ref title) => {
                    coords.insert(title.clone(), Coord::new(lat, long));
                }
                None => log::warn!("Saw coordinates before any article title: line={line}"),
            }
            if status.item_processed() {
                break;
            }
        }
    }
    Ok(coords)
}

/// Adds the counts of the links file to the articles, links to a redirect count
/// for the article it points to.
fn read_incoming_link_info(
    path: &Path,
    articles: &mut [Article],
    title_to_article: &HashMap<String, usize>,
    redirects: &HashMap<String, Article>,
    max_time: Option<Duration>,
) -> Result<(), ReadError> {
    log::info!("Reading incoming link info from {}...", path.display());
    let mut status = StatusMessage::new("article").with_max_time(max_time);
    for line in open(path)?.lines() {
        let line = line?;
        if line.starts_with(LINKS_HEADER) {
            continue;
        }
        if line.starts_with(LINKS_FOOTER) {
            break;
        }
        let Some(caps) = LINK_LINE.captures(&line) else {
            log::warn!("Strange line in links file, can't parse: line={line}");
            continue;
        };
        let Ok(links) = caps[2].parse::<u64>() else {
            log::warn!("Link count out of range: line={line}");
            continue;
        };
        let title = capfirst(&caps[1]);
        if let Some(idx) = title_to_article.get(&title) {
            let art = &mut articles[*idx];
            art.incoming_links = Some(art.incoming_links.unwrap_or(0) + links);
        }
        if let Some(redirect) = redirects.get(&title) {
            let target = capfirst(&redirect.redir);
            match title_to_article.get(&target) {
                Some(idx) => {
                    let art = &mut articles[*idx];
                    art.incoming_links = Some(art.incoming_links.unwrap_or(0) + links);
                }
                None => log::warn!("Found coordinates but no article for redirected-to article {target}"),
            }
        }
        if status.item_processed() {
            break;
        }
    }
    Ok(())
}

/// Produces the combined article data: every `Main` article with a coordinate,
/// with its incoming links and a split.
pub fn combine_article_data(
    article_data_file: impl AsRef<Path>,
    coords_file: impl AsRef<Path>,
    links_file: impl AsRef<Path>,
    splits: &SplitOptions,
    max_time: Option<Duration>,
) -> Result<Vec<Article>, GeotagError> {
    let coords = read_coordinates_file(coords_file, max_time)?;
    let mut articles = Vec::new();
    let mut title_to_article = HashMap::new();
    let mut redirects = HashMap::new();
    read_article_data_file(article_data_file, max_time, |mut art| {
        if art.namespace != "Main" {
            return;
        }
        let coord = coords.get(&art.title).copied();
        if coord.is_some() {
            art.coord = coord;
        }
        if art.is_redirect() && coords.contains_key(&capfirst(&art.redir)) {
            redirects.insert(art.title.clone(), art);
        } else if coord.is_some() {
            title_to_article.insert(art.title.clone(), articles.len());
            articles.push(art);
        }
    })?;

    read_incoming_link_info(links_file.as_ref(), &mut articles, &title_to_article, &redirects, max_time)?;

    let split_names = [Split::Training, Split::Dev, Split::Test];
    let mut split_gen = next_split_set(&[splits.training_fraction, splits.dev_fraction, splits.test_fraction])?
        .with_max_split_sizes(&[splits.max_training_size, splits.max_dev_size, splits.max_test_size]);
    let mut unassigned = 0usize;
    for art in articles.iter_mut() {
        art.split = match split_gen.next() {
            Some(idx) => split_names[idx],
            None => {
                unassigned += 1;
                Split::Unknown
            }
        };
    }
    if unassigned > 0 {
        log::warn!("Every split is full, {unassigned} articles stay in split {}", Split::Unknown);
    }
    Ok(articles)
}
