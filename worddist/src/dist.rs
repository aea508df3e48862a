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

use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter};
use arcstr::ArcStr;
use itertools::Itertools;
use crate::corpus::CorpusStatistics;
use crate::counts::WordCounts;
use crate::errors::WordDistError;
use crate::{Probability, Word};

/// A smoothed unigram distribution over the words of a document or region.
///
/// The probability mass of the words seen once (bounded by 0.5) is reserved for
/// unseen words. Words seen in the corpus but not in the document share that mass
/// in proportion to their global probability, words never seen anywhere share the
/// global unseen probability evenly.
///
/// A distribution is mutable until [WordDist::finish] is called.
#[derive(Debug, Clone)]
pub struct WordDist {
    counts: WordCounts,
    total_tokens: u64,
    unseen_mass: Probability,
    overall_unseen_mass: Probability,
    finished: bool,
}

impl Default for WordDist {
    fn default() -> Self {
        Self {
            counts: WordCounts::default(),
            total_tokens: 0,
            unseen_mass: Self::DEFAULT_UNSEEN_MASS,
            overall_unseen_mass: 1.0,
            finished: false,
        }
    }
}

impl WordDist {
    pub const DEFAULT_UNSEEN_MASS: Probability = 0.5;

    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a distribution from counts, the total is the sum of the counts.
    pub fn from_counts(
        stats: &mut CorpusStatistics,
        counts: impl IntoIterator<Item = (Word, u64)>,
        note_globally: bool,
    ) -> Result<Self, WordDistError> {
        let counts: HashMap<Word, u64> = counts.into_iter().collect();
        let total = counts.values().sum();
        let mut dist = Self::new();
        dist.set_word_distribution(stats, total, counts, note_globally)?;
        Ok(dist)
    }

    fn ensure_mutable(&self) -> Result<(), WordDistError> {
        if self.finished {
            Err(WordDistError::AlreadyFinished)
        } else {
            Ok(())
        }
    }

    /// Replaces the counts. With `note_globally` the counts become part of the corpus statistics.
    pub fn set_word_distribution(
        &mut self,
        stats: &mut CorpusStatistics,
        total_tokens: u64,
        counts: HashMap<Word, u64>,
        note_globally: bool,
    ) -> Result<(), WordDistError> {
        self.ensure_mutable()?;
        if !self.counts.is_empty() {
            log::warn!("Word distribution already set, overwriting {} words", self.counts.len());
        }
        if note_globally {
            stats.note_counts(counts.iter().map(|(w, c)| (w, *c)))?;
        }
        self.counts = WordCounts::Hashed(counts);
        self.total_tokens = total_tokens;
        Ok(())
    }

    /// Counts the given words, optionally lower casing them and skipping stopwords.
    pub fn add_words<'a>(
        &mut self,
        words: impl IntoIterator<Item = &'a str>,
        ignore_case: bool,
        stopwords: &HashSet<String>,
    ) -> Result<(), WordDistError> {
        self.ensure_mutable()?;
        let counts = self.counts.as_hashed_mut();
        for word in words {
            let word = if ignore_case { word.to_lowercase() } else { word.to_string() };
            if stopwords.contains(&word) {
                continue;
            }
            match counts.get_mut(word.as_str()) {
                Some(value) => *value += 1,
                None => {
                    counts.insert(ArcStr::from(word), 1);
                }
            }
            self.total_tokens += 1;
        }
        Ok(())
    }

    /// Adds the counts of another distribution to this one.
    pub fn add_word_distribution(&mut self, other: &WordDist) -> Result<(), WordDistError> {
        self.ensure_mutable()?;
        let counts = self.counts.as_hashed_mut();
        for (word, count) in other.counts.iter() {
            *counts.entry(word.clone()).or_default() += count;
        }
        self.total_tokens += other.total_tokens;
        Ok(())
    }

    /// Computes the smoothing parameters and freezes the distribution.
    ///
    /// Words with a count below `minimum_word_count` are dropped when it is larger than 1.
    /// Finishing twice does nothing. The statistics have to be finished already.
    pub fn finish(&mut self, stats: &CorpusStatistics, minimum_word_count: u64) -> Result<(), WordDistError> {
        if self.finished {
            return Ok(());
        }
        if !stats.is_finished() {
            return Err(WordDistError::StatisticsUnfinished);
        }
        if minimum_word_count > 1 {
            let counts = self.counts.as_hashed_mut();
            let mut removed = 0;
            counts.retain(|_, count| {
                if *count < minimum_word_count {
                    removed += *count;
                    false
                } else {
                    true
                }
            });
            self.total_tokens -= removed.min(self.total_tokens);
        }

        if !self.counts.is_empty() {
            let num_types_seen_once = self.counts.iter().filter(|(_, c)| *c == 1).count();
            self.unseen_mass = if self.total_tokens > 0 {
                Self::DEFAULT_UNSEEN_MASS.min(num_types_seen_once.max(1) as f64 / self.total_tokens as f64)
            } else {
                Self::DEFAULT_UNSEEN_MASS
            };
            let overall_seen_mass: Probability = self.counts
                .words()
                .filter_map(|w| stats.overall_word_prob(w))
                .sum();
            self.overall_unseen_mass = 1.0 - overall_seen_mass;
        }
        self.counts.compact();
        self.finished = true;
        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn counts(&self) -> &WordCounts {
        &self.counts
    }

    pub fn count(&self, word: &str) -> Option<u64> {
        self.counts.get(word)
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_tokens
    }

    pub fn unseen_mass(&self) -> Probability {
        self.unseen_mass
    }

    pub fn overall_unseen_mass(&self) -> Probability {
        self.overall_unseen_mass
    }

    pub fn num_word_types(&self) -> usize {
        self.counts.len()
    }

    /// Scale applied to the counts of the seen words.
    pub(crate) fn seen_factor(&self) -> Probability {
        if self.total_tokens == 0 {
            0.0
        } else {
            (1.0 - self.unseen_mass) / self.total_tokens as f64
        }
    }

    /// Scale applied to the global probability of words only seen in the corpus.
    pub(crate) fn globally_seen_factor(&self) -> Probability {
        self.unseen_mass / self.overall_unseen_mass
    }

    /// Probability of a word never seen in the corpus.
    pub(crate) fn never_seen_prob(&self, stats: &CorpusStatistics) -> Probability {
        self.unseen_mass * stats.unseen_word_share()
    }

    /// The smoothed probability of a word.
    pub fn lookup_word(&self, stats: &CorpusStatistics, word: &str) -> Probability {
        if let Some(count) = self.counts.get(word) {
            return count as f64 * self.seen_factor();
        }
        match stats.overall_word_prob(word) {
            Some(owp) => owp * self.globally_seen_factor(),
            None => self.never_seen_prob(stats),
        }
    }

    /// The relative frequency of a word without smoothing.
    pub fn relative_frequency(&self, word: &str) -> Probability {
        match self.counts.get(word) {
            Some(count) if self.total_tokens > 0 => count as f64 / self.total_tokens as f64,
            _ => 0.0
        }
    }

    /// The word with the highest count that satisfies the predicate.
    pub fn most_common_word_where(&self, mut predicate: impl FnMut(&str) -> bool) -> Option<Word> {
        self.counts
            .iter()
            .filter(|(w, _)| predicate(w.as_str()))
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(w, _)| w.clone())
    }
}

impl Display for WordDist {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        const MAX_ITEMS: usize = 15;
        write!(
            f,
            "WordDist({} tokens, {:.2} unseen mass",
            self.total_tokens,
            self.unseen_mass
        )?;
        if !self.finished {
            write!(f, ", unfinished")?;
        }
        let items = self.counts
            .iter()
            .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)))
            .take(MAX_ITEMS)
            .map(|(w, c)| format!("{w}={c}"))
            .join(" ");
        if !items.is_empty() {
            write!(f, ", {items}")?;
        }
        if self.counts.len() > MAX_ITEMS {
            write!(f, " ...")?;
        }
        write!(f, ")")
    }
}
