//Copyright 2024 Felix Engl
//
//Licensed under the Apache License, Version 2.0 (the "License");
//you may not use this file except in compliance with the License.
//You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
//Unless required by applicable law or agreed to in writing, software
//distributed under the License is distributed on an "AS IS" BASIS,
//WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//See the License for the specific language governing permissions and
//limitations under the License.

use std::collections::{BTreeMap, HashMap};
use std::fmt::{Display, Formatter};
use geogrounder_toolkit::status::StatusMessage;
use geogrounder_worddist::{CorpusStatistics, WordDist, WordDistError};
use crate::article::table::ArticleTable;
use crate::article::{adjusted_incoming_links, ArticleId, Split, StatArticle};
use crate::coord::Coord;
use crate::grid::{RegionGrid, RegionIndices};

/// The combined word distribution of a set of articles.
#[derive(Debug, Clone, Default)]
pub struct RegionWordDist {
    pub dist: WordDist,
    /// Articles seen, with or without a distribution.
    pub num_arts_for_links: usize,
    /// Sum of the known incoming links of all articles seen.
    pub incoming_links: u64,
    /// Articles whose distribution went into [RegionWordDist::dist].
    pub num_arts_for_word_dist: usize,
}

impl RegionWordDist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.num_arts_for_links == 0
    }

    pub fn is_empty_for_word_dist(&self) -> bool {
        self.num_arts_for_word_dist == 0
    }

    /// Links used for scoring the region, see [adjusted_incoming_links].
    pub fn adjusted_incoming_links(&self) -> f64 {
        adjusted_incoming_links(Some(self.incoming_links))
    }

    /// Adds the given articles. Only training articles with a distribution contribute
    /// words, every article contributes its links.
    ///
    /// `warn_missing` reports articles without a distribution, which is expected when
    /// only part of the word counts was read.
    pub fn add_articles<'a>(&mut self, articles: impl IntoIterator<Item = &'a StatArticle>, warn_missing: bool) -> Result<(), WordDistError> {
        for art in articles {
            if let Some(links) = art.incoming_links {
                self.incoming_links += links;
            }
            self.num_arts_for_links += 1;
            let Some(ref dist) = art.dist else {
                if warn_missing {
                    log::warn!("Saw article {art} without distribution");
                }
                continue;
            };
            if art.split != Split::Training {
                continue;
            }
            self.dist.add_word_distribution(dist)?;
            self.num_arts_for_word_dist += 1;
        }
        Ok(())
    }

    pub fn finish(&mut self, stats: &CorpusStatistics, minimum_word_count: u64) -> Result<(), WordDistError> {
        self.dist.finish(stats, minimum_word_count)?;
        log::trace!(
            "For region dist, num articles = {}, total tokens = {}, unseen_mass = {}, incoming links = {}, overall unseen mass = {}",
            self.num_arts_for_word_dist,
            self.dist.total_tokens(),
            self.dist.unseen_mass(),
            self.incoming_links,
            self.dist.overall_unseen_mass()
        );
        Ok(())
    }
}

/// A square of `width_of_stat_region` tiling regions on a side with the combined
/// distribution of the articles inside.
#[derive(Debug, Clone, Default)]
pub struct StatRegion {
    /// Indices of the south west tiling region, `None` for the shared empty region.
    pub indices: Option<RegionIndices>,
    pub worddist: RegionWordDist,
    pub most_popular_article: Option<ArticleId>,
    pub mostpopart_links: u64,
}

impl StatRegion {
    fn generate(
        indices: RegionIndices,
        grid: &RegionGrid,
        tiling_region_to_articles: &HashMap<RegionIndices, Vec<ArticleId>>,
        articles: &ArticleTable,
        stats: &CorpusStatistics,
        minimum_word_count: u64,
        warn_missing: bool,
    ) -> Result<Self, WordDistError> {
        let mut region = StatRegion { indices: Some(indices), ..Default::default() };
        let (reglat, reglong) = indices;
        let width = grid.width_of_stat_region();
        // latitudes are truncated at the pole, longitudes wrap
        for i in reglat..(grid.max_latind() + 1).min(reglat + width) {
            for j in reglong..reglong + width {
                let Some(ids) = tiling_region_to_articles.get(&(i, grid.wrap_longind(j))) else {
                    continue;
                };
                region.worddist.add_articles(ids.iter().map(|id| articles.get(*id)), warn_missing)?;
                for id in ids {
                    if let Some(links) = articles.get(*id).incoming_links {
                        if links > region.mostpopart_links {
                            region.mostpopart_links = links;
                            region.most_popular_article = Some(*id);
                        }
                    }
                }
            }
        }
        region.worddist.finish(stats, minimum_word_count)?;
        Ok(region)
    }

    pub fn latind(&self) -> Option<i32> {
        self.indices.map(|(lat, _)| lat)
    }

    pub fn longind(&self) -> Option<i32> {
        self.indices.map(|(_, long)| long)
    }

    pub fn center(&self, grid: &RegionGrid) -> Option<Coord> {
        self.indices.map(|(lat, long)| grid.stat_region_indices_to_center_coord(lat, long))
    }

    pub fn display<'a>(&'a self, grid: &'a RegionGrid, articles: &'a ArticleTable) -> StatRegionDisplay<'a> {
        StatRegionDisplay { region: self, grid, articles }
    }
}

pub struct StatRegionDisplay<'a> {
    region: &'a StatRegion,
    grid: &'a RegionGrid,
    articles: &'a ArticleTable,
}

impl Display for StatRegionDisplay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let region = self.region;
        write!(f, "StatRegion(")?;
        match region.indices {
            Some((lat, long)) => write!(
                f,
                "{}-{}",
                self.grid.stat_region_indices_to_near_corner_coord(lat, long),
                self.grid.stat_region_indices_to_far_corner_coord(lat, long)
            )?,
            None => write!(f, "nowhere")?,
        }
        if !region.worddist.dist.is_finished() {
            write!(f, ", unfinished")?;
        }
        if let Some(id) = region.most_popular_article {
            write!(f, ", most-pop-art {}({} links)", self.articles.get(id), region.mostpopart_links)?;
        }
        write!(
            f,
            ", {} articles(dist), {} articles(links), {} links)",
            region.worddist.num_arts_for_word_dist,
            region.worddist.num_arts_for_links,
            region.worddist.incoming_links
        )
    }
}

/// Owns the tiling of the articles and the statistical regions built from it.
#[derive(Debug)]
pub struct StatRegionTable {
    grid: RegionGrid,
    minimum_word_count: u64,
    warn_missing_dists: bool,
    tiling_region_to_articles: HashMap<RegionIndices, Vec<ArticleId>>,
    corner_to_stat_region: BTreeMap<RegionIndices, StatRegion>,
    empty_stat_region: StatRegion,
    all_regions_computed: bool,
    num_empty_regions: usize,
    num_non_empty_regions: usize,
    total_num_arts_for_links: usize,
    total_num_arts_for_word_dist: usize,
}

impl StatRegionTable {
    /// `warn_missing_dists` is false when only part of the word counts is read.
    pub fn new(grid: RegionGrid, minimum_word_count: u64, warn_missing_dists: bool) -> Self {
        Self {
            grid,
            minimum_word_count,
            warn_missing_dists,
            tiling_region_to_articles: HashMap::new(),
            corner_to_stat_region: BTreeMap::new(),
            empty_stat_region: StatRegion::default(),
            all_regions_computed: false,
            num_empty_regions: 0,
            num_non_empty_regions: 0,
            total_num_arts_for_links: 0,
            total_num_arts_for_word_dist: 0,
        }
    }

    pub fn grid(&self) -> &RegionGrid {
        &self.grid
    }

    pub fn minimum_word_count(&self) -> u64 {
        self.minimum_word_count
    }

    pub fn warn_missing_dists(&self) -> bool {
        self.warn_missing_dists
    }

    /// The region returned for places without articles.
    pub fn empty_region(&self) -> &StatRegion {
        &self.empty_stat_region
    }

    pub fn all_regions_computed(&self) -> bool {
        self.all_regions_computed
    }

    pub fn num_empty_regions(&self) -> usize {
        self.num_empty_regions
    }

    pub fn num_non_empty_regions(&self) -> usize {
        self.num_non_empty_regions
    }

    pub fn total_num_arts_for_links(&self) -> usize {
        self.total_num_arts_for_links
    }

    pub fn total_num_arts_for_word_dist(&self) -> usize {
        self.total_num_arts_for_word_dist
    }

    /// Puts an article with a coordinate into its tiling region.
    pub fn add_article_to_region(&mut self, id: ArticleId, coord: &Coord) {
        let indices = self.grid.coord_to_tiling_region_indices(coord);
        self.tiling_region_to_articles.entry(indices).or_default().push(id);
    }

    /// True if any article lies in the tiling region.
    pub fn is_nonempty_tiling_region(&self, indices: &RegionIndices) -> bool {
        self.tiling_region_to_articles.contains_key(indices)
    }

    /// The region with the given south west indices, created if necessary.
    ///
    /// With `no_create` a missing region yields `None`. Once every region is
    /// computed a missing region is the shared empty region. With `no_create_empty`
    /// an empty region is created but not stored and the shared empty region is returned.
    pub fn find_region_for_region_indices(
        &mut self,
        indices: RegionIndices,
        articles: &ArticleTable,
        stats: &CorpusStatistics,
        no_create: bool,
        no_create_empty: bool,
    ) -> Result<Option<&StatRegion>, WordDistError> {
        if !self.corner_to_stat_region.contains_key(&indices) {
            if no_create {
                return Ok(None);
            }
            if !self.all_regions_computed {
                let region = StatRegion::generate(
                    indices,
                    &self.grid,
                    &self.tiling_region_to_articles,
                    articles,
                    stats,
                    self.minimum_word_count,
                    self.warn_missing_dists,
                )?;
                let empty = region.worddist.is_empty();
                if empty {
                    self.num_empty_regions += 1;
                } else {
                    self.num_non_empty_regions += 1;
                }
                if !empty || !no_create_empty {
                    self.corner_to_stat_region.insert(indices, region);
                }
            }
        }
        Ok(Some(self.corner_to_stat_region.get(&indices).unwrap_or(&self.empty_stat_region)))
    }

    pub fn find_region_for_coord(&mut self, coord: &Coord, articles: &ArticleTable, stats: &CorpusStatistics) -> Result<&StatRegion, WordDistError> {
        let indices = self.grid.coord_to_stat_region_indices(coord);
        self.find_region_for_region_indices(indices, articles, stats, false, false)?;
        Ok(self.region_at(&indices))
    }

    /// A computed region, or the shared empty region if there is none at `indices`.
    pub fn region_at(&self, indices: &RegionIndices) -> &StatRegion {
        self.corner_to_stat_region.get(indices).unwrap_or(&self.empty_stat_region)
    }

    /// Like [StatRegionTable::region_at] for the region containing `coord`.
    pub fn region_for_coord(&self, coord: &Coord) -> &StatRegion {
        self.region_at(&self.grid.coord_to_stat_region_indices(coord))
    }

    /// Creates every non-empty region. Calling it again does nothing.
    ///
    /// Afterwards the tiling is released and, with `clear_training_dists`, the
    /// distributions of the training articles as well.
    pub fn initialize_regions(
        &mut self,
        articles: &mut ArticleTable,
        stats: &CorpusStatistics,
        clear_training_dists: bool,
    ) -> Result<(), WordDistError> {
        if self.all_regions_computed {
            return Ok(());
        }
        log::info!("Generating all non-empty statistical regions...");
        let mut status = StatusMessage::new("statistical region");
        for i in self.grid.min_latind()..=self.grid.max_latind() {
            for j in self.grid.min_longind()..=self.grid.max_longind() {
                self.find_region_for_region_indices((i, j), articles, stats, false, true)?;
                status.item_processed();
            }
        }
        self.empty_stat_region.worddist.finish(stats, 0)?;
        self.all_regions_computed = true;

        let (arts_for_word_dist, arts_for_links) = self
            .iter_nonempty_regions(false)
            .fold((0, 0), |(word_dist, links), region| {
                (word_dist + region.worddist.num_arts_for_word_dist, links + region.worddist.num_arts_for_links)
            });
        self.total_num_arts_for_word_dist = arts_for_word_dist;
        self.total_num_arts_for_links = arts_for_links;
        for (indices, region) in self.corner_to_stat_region.iter() {
            log::debug!("--> {indices:?}: {}", region.display(&self.grid, articles));
        }

        let total = self.num_empty_regions + self.num_non_empty_regions;
        log::info!("Number of non-empty regions: {}", self.num_non_empty_regions);
        log::info!("Number of empty regions: {}", self.num_empty_regions);
        log::info!(
            "Percent non-empty regions: {}",
            if total == 0 { 0.0 } else { self.num_non_empty_regions as f64 / total as f64 }
        );
        let training_arts = articles.num_word_count_articles_by_split.get(&Split::Training).copied().unwrap_or(0);
        log::info!(
            "Training articles per non-empty region: {}",
            if self.num_non_empty_regions == 0 { 0.0 } else { training_arts as f64 / self.num_non_empty_regions as f64 }
        );

        self.tiling_region_to_articles = HashMap::new();
        if clear_training_dists {
            articles.clear_training_article_distributions();
        }
        Ok(())
    }

    /// Regions with at least one article, or with `nonempty_word_dist` with at
    /// least one article distribution. Ordered by indices.
    pub fn iter_nonempty_regions(&self, nonempty_word_dist: bool) -> impl Iterator<Item = &StatRegion> {
        self.corner_to_stat_region.values().filter(move |region| {
            if nonempty_word_dist {
                !region.worddist.is_empty_for_word_dist()
            } else {
                !region.worddist.is_empty()
            }
        })
    }
}
