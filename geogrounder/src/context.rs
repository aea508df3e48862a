//! Everything read for a run, shared by the strategies and evaluators.

use std::collections::HashSet;
use std::rc::Rc;
use geogrounder_worddist::{CorpusStatistics, Word, WordDist};
use crate::article::table::ArticleTable;
use crate::article::ArticleId;
use crate::config::{GeotagConfig, Mode};
use crate::coord::{spheredist_opt, Coord};
use crate::errors::GeotagError;
use crate::gazetteer::world::read_world_gazetteer_and_match;
use crate::gazetteer::{Gazetteer, LocationRef};
use crate::grid::RegionGrid;
use crate::readers::{finish_word_counts, read_article_data, read_stopwords, read_word_counts, word_count_articles_writer};
use crate::region::{RegionWordDist, StatRegionTable};
use crate::region_dist::{RegionDist, RegionDistCache};

#[derive(Debug)]
pub struct GeoContext {
    pub config: GeotagConfig,
    pub articles: ArticleTable,
    pub stats: CorpusStatistics,
    pub regions: StatRegionTable,
    pub gazetteer: Gazetteer,
    pub stopwords: HashSet<String>,
    region_dists: RegionDistCache,
}

impl GeoContext {
    pub fn new(
        config: GeotagConfig,
        articles: ArticleTable,
        stats: CorpusStatistics,
        regions: StatRegionTable,
        gazetteer: Gazetteer,
        stopwords: HashSet<String>,
    ) -> Self {
        let region_dists = RegionDistCache::new(config.lru_cache_size);
        Self { config, articles, stats, regions, gazetteer, stopwords, region_dists }
    }

    /// Reads stopwords, article data, word counts and the gazetteer of a validated
    /// config and builds the statistical regions.
    pub fn load(config: GeotagConfig) -> Result<Self, GeotagError> {
        let stopwords = match config.stopwords_file {
            Some(ref path) => read_stopwords(path)?,
            None => HashSet::new(),
        };

        let warn_missing = config.max_time().is_none() && config.num_training_docs().is_none();
        let mut articles = ArticleTable::new();
        let mut regions = StatRegionTable::new(config.grid()?, config.minimum_word_count, warn_missing);
        for path in config.article_data_file.iter() {
            read_article_data(path, &mut articles, &mut regions, &config)?;
        }

        let mut stats = CorpusStatistics::new();
        let mut writer = word_count_articles_writer(&config)?;
        for path in config.counts_file.iter() {
            read_word_counts(path, &mut articles, &mut stats, &stopwords, &config, writer.as_mut())?;
        }
        if let Some(ref mut writer) = writer {
            writer.flush()?;
        }
        finish_word_counts(&mut articles, &mut stats, config.minimum_word_count)?;

        let mut gazetteer = Gazetteer::new();
        if let Some(ref path) = config.gazetteer_file {
            read_world_gazetteer_and_match(
                path,
                &mut gazetteer,
                &mut articles,
                &regions,
                config.max_dist_for_close_match,
                config.max_time(),
            )?;
        }

        // toponym resolution keeps the training distributions for the article context
        regions.initialize_regions(&mut articles, &stats, config.mode != Mode::GeotagToponyms)?;

        Ok(Self::new(config, articles, stats, regions, gazetteer, stopwords))
    }

    pub fn grid(&self) -> &RegionGrid {
        self.regions.grid()
    }

    /// True if the article is close to `coord` or matched with a division containing it.
    pub fn article_matches_coord(&self, id: ArticleId, coord: &Coord) -> bool {
        let art = self.articles.get(id);
        if spheredist_opt(art.coord.as_ref(), Some(coord)) <= self.config.max_dist_for_close_match {
            return true;
        }
        match art.location {
            Some(LocationRef::Division(div)) => self.gazetteer.division(div).matches_coord(coord),
            _ => false,
        }
    }

    /// The distribution of the division matched with the article, else the one
    /// of the statistical region the article lies in.
    pub fn article_region_worddist(&self, id: ArticleId) -> &RegionWordDist {
        let art = self.articles.get(id);
        if let Some(LocationRef::Division(div)) = art.location {
            return self.gazetteer.division_worddist(
                div,
                &self.articles,
                &self.stats,
                self.regions.minimum_word_count(),
                self.regions.warn_missing_dists(),
            );
        }
        match art.coord {
            Some(ref coord) => &self.regions.region_for_coord(coord).worddist,
            None => &self.regions.empty_region().worddist,
        }
    }

    /// The articles a toponym may refer to: those with the name and the matches
    /// of gazetteer entries with the name.
    pub fn construct_candidates(&self, toponym: &str) -> Vec<ArticleId> {
        let lower = toponym.to_lowercase();
        let mut candidates = self.articles.articles_for_toponym(&lower).to_vec();
        let locations = self.gazetteer.locations_for_toponym(&lower).iter().copied().map(LocationRef::Locality);
        let divisions = self.gazetteer.divisions_for_toponym(&lower).iter().copied().map(LocationRef::Division);
        for loc in locations.chain(divisions) {
            if let Some(matched) = self.gazetteer.matched_article(loc) {
                if !candidates.contains(&matched) {
                    candidates.push(matched);
                }
            }
        }
        candidates
    }

    pub fn word_is_toponym(&self, word: &str) -> bool {
        let lower = word.to_lowercase();
        !self.articles.articles_for_toponym(&lower).is_empty() || self.gazetteer.is_toponym(&lower)
    }

    pub fn region_dist_for_word(&self, word: &Word) -> Rc<RegionDist> {
        self.region_dists.get(word, &self.regions, &self.stats)
    }

    pub fn region_dist_for_word_dist(&self, dist: &WordDist) -> RegionDist {
        RegionDist::for_word_dist(dist, &self.region_dists, &self.regions, &self.stats)
    }
}
