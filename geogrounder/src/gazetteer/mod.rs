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

pub mod world;

use std::cell::OnceCell;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use itertools::Itertools;
use geogrounder_worddist::CorpusStatistics;
use crate::article::table::{ArticleTable, MatchCriterion};
use crate::article::ArticleId;
use crate::boundary::Boundary;
use crate::coord::{spheredist, Coord};
use crate::grid::{RegionGrid, RegionIndices};
use crate::region::{RegionWordDist, StatRegionTable};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalityId(usize);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DivisionId(usize);

/// A reference from an article to the gazetteer entry it was matched with.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LocationRef {
    Locality(LocalityId),
    Division(DivisionId),
}

/// A gazetteer entry with a single coordinate.
#[derive(Debug, Clone)]
pub struct Locality {
    pub name: String,
    pub altnames: Vec<String>,
    /// The type column of the gazetteer, e.g. `locality` or `agglomeration`.
    pub kind: String,
    pub coord: Coord,
    /// The lowest division containing the locality.
    pub div: Option<DivisionId>,
    pub matched: Option<ArticleId>,
}

impl Locality {
    pub fn new(name: impl Into<String>, coord: Coord) -> Self {
        Self {
            name: name.into(),
            altnames: Vec::new(),
            kind: String::new(),
            coord,
            div: None,
            matched: None,
        }
    }

    pub fn distance_to_coord(&self, coord: &Coord) -> f64 {
        spheredist(&self.coord, coord)
    }

    pub fn matches_coord(&self, coord: &Coord, max_dist_for_close_match: f64) -> bool {
        self.distance_to_coord(coord) <= max_dist_for_close_match
    }
}

/// A division above the level of single localities, for example country, state
/// and county. The area is the bounding box of the localities inside.
#[derive(Debug, Clone)]
pub struct Division {
    pub name: String,
    pub altnames: Vec<String>,
    /// Names of the divisions from the highest to this one.
    pub path: Vec<String>,
    pub level: usize,
    pub locs: Vec<LocalityId>,
    /// The localities used for the boundary.
    pub goodlocs: Vec<LocalityId>,
    pub boundary: Option<Boundary>,
    /// The next higher division.
    pub div: Option<DivisionId>,
    pub matched: Option<ArticleId>,
    worddist: OnceCell<RegionWordDist>,
}

impl Division {
    fn new(path: Vec<String>, div: Option<DivisionId>) -> Self {
        Self {
            name: path.last().cloned().unwrap_or_default(),
            altnames: Vec::new(),
            level: path.len(),
            path,
            locs: Vec::new(),
            goodlocs: Vec::new(),
            boundary: None,
            div,
            matched: None,
            worddist: OnceCell::new(),
        }
    }

    pub fn matches_coord(&self, coord: &Coord) -> bool {
        self.boundary.is_some_and(|boundary| boundary.contains(coord))
    }
}

/// Owns the localities and divisions and the lookup tables over their names.
#[derive(Debug, Default)]
pub struct Gazetteer {
    localities: Vec<Locality>,
    divisions: Vec<Division>,
    path_to_division: HashMap<Vec<String>, DivisionId>,
    lower_toponym_to_location: HashMap<String, Vec<LocalityId>>,
    lower_toponym_to_division: HashMap<String, Vec<DivisionId>>,
    tiling_region_to_divisions: HashMap<RegionIndices, Vec<DivisionId>>,
}

impl Gazetteer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn locality(&self, id: LocalityId) -> &Locality {
        &self.localities[id.0]
    }

    pub fn division(&self, id: DivisionId) -> &Division {
        &self.divisions[id.0]
    }

    pub fn num_localities(&self) -> usize {
        self.localities.len()
    }

    pub fn num_divisions(&self) -> usize {
        self.divisions.len()
    }

    pub fn division_for_path(&self, path: &[&str]) -> Option<DivisionId> {
        let path = path.iter().map(|s| s.to_string()).collect_vec();
        self.path_to_division.get(&path).copied()
    }

    pub fn locations_for_toponym(&self, lower_toponym: &str) -> &[LocalityId] {
        self.lower_toponym_to_location.get(lower_toponym).map_or(&[], Vec::as_slice)
    }

    pub fn divisions_for_toponym(&self, lower_toponym: &str) -> &[DivisionId] {
        self.lower_toponym_to_division.get(lower_toponym).map_or(&[], Vec::as_slice)
    }

    pub fn is_toponym(&self, lower_toponym: &str) -> bool {
        self.lower_toponym_to_location.contains_key(lower_toponym)
            || self.lower_toponym_to_division.contains_key(lower_toponym)
    }

    /// The article matched with a location.
    pub fn matched_article(&self, loc: LocationRef) -> Option<ArticleId> {
        match loc {
            LocationRef::Locality(id) => self.locality(id).matched,
            LocationRef::Division(id) => self.division(id).matched,
        }
    }

    /// Stores a locality inside of the divisions named by `path` and registers all of its names.
    pub fn add_locality(&mut self, loc: Locality, path: &[String]) -> LocalityId {
        let id = LocalityId(self.localities.len());
        self.localities.push(loc);
        let div = if path.is_empty() { None } else { self.find_division_note_point(id, path) };
        let loc = &mut self.localities[id.0];
        loc.div = div;
        for name in std::iter::once(&loc.name).chain(loc.altnames.iter()) {
            self.lower_toponym_to_location.entry(name.to_lowercase()).or_default().push(id);
        }
        id
    }

    /// Adds the locality to the division at `path` and to every higher division,
    /// creating them as necessary. Returns the lowest division.
    ///
    /// A path ending in an empty name refers to the higher division.
    pub fn find_division_note_point(&mut self, loc: LocalityId, path: &[String]) -> Option<DivisionId> {
        let (last, higher) = path.split_last()?;
        let higherdiv = if higher.is_empty() { None } else { self.find_division_note_point(loc, higher) };
        if last.is_empty() {
            return higherdiv;
        }
        let id = match self.path_to_division.get(path) {
            Some(id) => *id,
            None => {
                let id = DivisionId(self.divisions.len());
                self.divisions.push(Division::new(path.to_vec(), higherdiv));
                self.path_to_division.insert(path.to_vec(), id);
                self.lower_toponym_to_division.entry(last.to_lowercase()).or_default().push(id);
                id
            }
        };
        self.divisions[id.0].locs.push(loc);
        Some(id)
    }

    fn div_path(&self, div: Option<DivisionId>) -> &[String] {
        div.map_or(&[], |id| self.division(id).path.as_slice())
    }

    /// Finds the article for a locality, it has to be at most `maxdist` miles away.
    pub fn find_match_for_locality(&self, articles: &ArticleTable, id: LocalityId, maxdist: f64) -> Option<ArticleId> {
        let loc = self.locality(id);
        let names = std::iter::once(loc.name.as_str()).chain(loc.altnames.iter().map(String::as_str));
        let criterion = MatchCriterion::Near { coord: loc.coord, max_dist: maxdist };
        articles.find_wikipedia_match(names, self.div_path(loc.div), &criterion)
    }

    /// Finds the article for a division, its coordinate has to be inside the boundary.
    pub fn find_match_for_division(&self, articles: &ArticleTable, id: DivisionId) -> Option<ArticleId> {
        let div = self.division(id);
        let boundary = div.boundary.as_ref()?;
        let names = std::iter::once(div.name.as_str()).chain(div.altnames.iter().map(String::as_str));
        articles.find_wikipedia_match(names, self.div_path(div.div), &MatchCriterion::Inside(boundary))
    }

    /// Matches a locality with an article, widening the distance from 5 miles up to
    /// `max_dist_for_close_match`. Sets the references on both sides.
    pub fn match_locality(&mut self, articles: &mut ArticleTable, id: LocalityId, max_dist_for_close_match: f64) -> Option<ArticleId> {
        let mut maxdist = 5.0;
        let mut found = None;
        while maxdist <= max_dist_for_close_match {
            found = self.find_match_for_locality(articles, id, maxdist);
            if found.is_some() {
                break;
            }
            maxdist *= 2.0;
        }
        match found {
            Some(art) => {
                self.localities[id.0].matched = Some(art);
                articles.get_mut(art).location = Some(LocationRef::Locality(id));
                log::trace!("Matched location {} with article {}", self.describe(LocationRef::Locality(id)), articles.get(art));
            }
            None => log::trace!("Unmatched name {}", self.locality(id).name)
        }
        found
    }

    fn compute_boundary(&mut self, id: DivisionId) {
        let div = &mut self.divisions[id.0];
        // every location counts, no outlier rejection
        div.goodlocs = div.locs.clone();
        let coords = div.goodlocs.iter().map(|loc| self.localities[loc.0].coord).collect_vec();
        if coords.is_empty() {
            return;
        }
        let lats = coords.iter().map(|c| c.lat);
        let longs = coords.iter().map(|c| c.long);
        let botleft = Coord::new(lats.clone().fold(f64::INFINITY, f64::min), longs.clone().fold(f64::INFINITY, f64::min));
        let topright = Coord::new(lats.fold(f64::NEG_INFINITY, f64::max), longs.fold(f64::NEG_INFINITY, f64::max));
        div.boundary = Some(Boundary::new(botleft, topright));
    }

    /// Computes the boundaries, matches every division with an article and notes
    /// which tiling regions with articles each division covers.
    pub fn finish_all(&mut self, articles: &mut ArticleTable, regions: &StatRegionTable) {
        for idx in 0..self.divisions.len() {
            let id = DivisionId(idx);
            self.compute_boundary(id);
            match self.find_match_for_division(articles, id) {
                Some(art) => {
                    log::trace!("Matched article {} for division {}", articles.get(art), self.describe(LocationRef::Division(id)));
                    self.divisions[idx].matched = Some(art);
                    articles.get_mut(art).location = Some(LocationRef::Division(id));
                }
                None => log::trace!("Couldn't find match for division {}", self.divisions[idx].path.join("/"))
            }
            if let Some(boundary) = self.divisions[idx].boundary {
                for indices in boundary.iter_tiling_regions(regions.grid()) {
                    if regions.is_nonempty_tiling_region(&indices) {
                        self.tiling_region_to_divisions.entry(indices).or_default().push(id);
                    }
                }
                log::trace!("{:.2} square miles: {}", boundary.square_area(), self.divisions[idx].path.join("/"));
            }
        }
    }

    /// The combined distribution of the article of the division and the articles of
    /// its localities, created on first use.
    pub fn division_worddist(
        &self,
        id: DivisionId,
        articles: &ArticleTable,
        stats: &CorpusStatistics,
        minimum_word_count: u64,
        warn_missing: bool,
    ) -> &RegionWordDist {
        let div = self.division(id);
        div.worddist.get_or_init(|| {
            let mut worddist = RegionWordDist::new();
            let matched = div.matched.into_iter()
                .chain(div.goodlocs.iter().filter_map(|loc| self.locality(*loc).matched))
                .map(|art| articles.get(art))
                .collect_vec();
            let result = worddist.add_articles(matched, warn_missing)
                .and_then(|_| worddist.finish(stats, minimum_word_count));
            if let Err(err) = result {
                log::warn!("Failed to build the distribution of division {}: {err}", div.path.join("/"));
            }
            worddist
        })
    }

    /// Divisions whose boundary contains the coordinate.
    pub fn find_covering_divisions(&self, grid: &RegionGrid, coord: &Coord) -> Vec<DivisionId> {
        let indices = grid.coord_to_tiling_region_indices(coord);
        self.tiling_region_to_divisions
            .get(&indices)
            .map(|divs| divs.iter().copied().filter(|div| self.division(*div).matches_coord(coord)).collect())
            .unwrap_or_default()
    }

    pub fn describe(&self, loc: LocationRef) -> LocationDisplay<'_> {
        LocationDisplay { gazetteer: self, loc }
    }
}

pub struct LocationDisplay<'a> {
    gazetteer: &'a Gazetteer,
    loc: LocationRef,
}

impl Display for LocationDisplay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.loc {
            LocationRef::Locality(id) => {
                let loc = self.gazetteer.locality(id);
                write!(f, "Locality {} ({}) at {}", loc.name, self.gazetteer.div_path(loc.div).join("/"), loc.coord)
            }
            LocationRef::Division(id) => {
                let div = self.gazetteer.division(id);
                write!(f, "Division {} ({})", div.name, div.path.join("/"))?;
                match div.boundary {
                    Some(boundary) => write!(f, ", boundary={boundary}"),
                    None => Ok(())
                }
            }
        }
    }
}
