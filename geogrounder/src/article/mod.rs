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

pub mod io;
pub mod table;

use std::fmt::{Display, Formatter};
use std::ops::{Deref, DerefMut};
use std::sync::LazyLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use geogrounder_worddist::WordDist;
use crate::coord::Coord;
use crate::gazetteer::LocationRef;
use crate::grid::RegionIndices;

/// The split an article belongs to.
#[derive(
    Debug, Copy, Clone, Ord, PartialOrd, PartialEq, Eq, Hash, Default, AsRefStr, Display, EnumString, EnumIter, Serialize, Deserialize
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Training,
    #[strum(to_string = "dev", serialize = "devel")]
    Dev,
    Test,
    #[default]
    Unknown,
}

/// The index of an article in the [table::ArticleTable].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArticleId(pub(crate) usize);

impl ArticleId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A row of the article data file.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub title: String,
    pub id: i64,
    pub coord: Option<Coord>,
    /// Number of incoming links, `None` if unknown.
    pub incoming_links: Option<u64>,
    pub split: Split,
    /// Title of the article this one redirects to, empty if no redirect.
    pub redir: String,
    pub namespace: String,
    pub is_list_of: bool,
    pub is_disambig: bool,
    pub is_list: bool,
}

impl Default for Article {
    fn default() -> Self {
        Self {
            title: "unknown".to_string(),
            id: 0,
            coord: None,
            incoming_links: None,
            split: Split::Unknown,
            redir: String::new(),
            namespace: "Main".to_string(),
            is_list_of: false,
            is_disambig: false,
            is_list: false,
        }
    }
}

impl Article {
    pub fn is_redirect(&self) -> bool {
        !self.redir.is_empty()
    }
}

impl Display for Article {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.title, self.id)?;
        if let Some(coord) = self.coord {
            write!(f, " at {coord}")?;
        }
        if self.is_redirect() {
            write!(f, ", redirect to {}", self.redir)?;
        }
        Ok(())
    }
}

/// Links used for scoring, unknown or zero counts become 0.01 so that the logarithm is defined.
pub fn adjusted_incoming_links(incoming_links: Option<u64>) -> f64 {
    match incoming_links {
        None => {
            log::trace!("Strange, no link count available");
            0.01
        }
        Some(0) => 0.01,
        Some(links) => links as f64,
    }
}

static SHORT_FORM_WITH_DIV: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.*?), (.*)$").unwrap());
static SHORT_FORM_WITH_PAREN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.*) \(.*\)$").unwrap());

/// Splits `Tucson, Arizona` into `("Tucson", Some("Arizona"))` and `Paris (band)` into `("Paris", None)`.
pub fn compute_short_form(name: &str) -> (String, Option<String>) {
    if let Some(caps) = SHORT_FORM_WITH_DIV.captures(name) {
        return (caps[1].to_string(), Some(caps[2].to_string()));
    }
    if let Some(caps) = SHORT_FORM_WITH_PAREN.captures(name) {
        return (caps[1].to_string(), None);
    }
    (name.to_string(), None)
}

/// An article together with everything computed for it.
#[derive(Debug, Clone, Default)]
pub struct StatArticle {
    pub article: Article,
    /// Word distribution, only present if the word counts were read and kept.
    pub dist: Option<WordDist>,
    /// The gazetteer location matched with this article.
    pub location: Option<LocationRef>,
    pub stat_region: Option<RegionIndices>,
}

impl StatArticle {
    pub fn new(article: Article) -> Self {
        Self { article, dist: None, location: None, stat_region: None }
    }

    pub fn adjusted_incoming_links(&self) -> f64 {
        adjusted_incoming_links(self.article.incoming_links)
    }
}

impl Deref for StatArticle {
    type Target = Article;

    fn deref(&self) -> &Self::Target {
        &self.article
    }
}

impl DerefMut for StatArticle {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.article
    }
}

impl Display for StatArticle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.article, f)
    }
}
