use std::collections::HashMap;
use crate::errors::WordDistError;
use crate::{Probability, Word};

/// Corpus wide word statistics shared by every distribution.
///
/// Training distributions note their counts here while they are read. After
/// [CorpusStatistics::finish_global_distribution] the statistics are frozen and
/// provide the global word probabilities used for smoothing.
#[derive(Debug, Clone, Default)]
pub struct CorpusStatistics {
    num_word_types: usize,
    num_word_tokens: u64,
    global_counts: HashMap<Word, u64>,
    overall_word_probs: HashMap<Word, Probability>,
    num_types_seen_once: usize,
    globally_unseen_word_prob: Probability,
    num_unseen_word_types: usize,
    finished: bool,
}

impl CorpusStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the counts of a training distribution.
    pub fn note_counts<'a>(&mut self, counts: impl IntoIterator<Item = (&'a Word, u64)>) -> Result<(), WordDistError> {
        if self.finished {
            return Err(WordDistError::StatisticsAlreadyFinished);
        }
        for (word, count) in counts {
            match self.global_counts.get_mut(word.as_str()) {
                Some(value) => *value += count,
                None => {
                    self.num_word_types += 1;
                    self.global_counts.insert(word.clone(), count);
                }
            }
            self.num_word_tokens += count;
        }
        Ok(())
    }

    /// Computes the global probabilities with the same seen-once smoothing the
    /// single distributions use.
    pub fn finish_global_distribution(&mut self) {
        if self.finished {
            return;
        }
        self.num_types_seen_once = self.global_counts.values().filter(|c| **c == 1).count();
        self.globally_unseen_word_prob = if self.num_word_tokens > 0 {
            self.num_types_seen_once as f64 / self.num_word_tokens as f64
        } else {
            0.0
        };
        let tokens = self.num_word_tokens as f64;
        let seen_mass = 1.0 - self.globally_unseen_word_prob;
        self.overall_word_probs = self.global_counts
            .iter()
            .map(|(word, count)| (word.clone(), *count as f64 / tokens * seen_mass))
            .collect();
        self.num_unseen_word_types = self.num_types_seen_once.max(self.num_word_types / 20);
        self.finished = true;
        log::info!(
            "Global distribution: {} types, {} tokens, {} types seen once, unseen word prob {}, estimated {} unseen types",
            self.num_word_types,
            self.num_word_tokens,
            self.num_types_seen_once,
            self.globally_unseen_word_prob,
            self.num_unseen_word_types
        );
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn num_word_types(&self) -> usize {
        self.num_word_types
    }

    pub fn num_word_tokens(&self) -> u64 {
        self.num_word_tokens
    }

    pub fn num_types_seen_once(&self) -> usize {
        self.num_types_seen_once
    }

    pub fn globally_unseen_word_prob(&self) -> Probability {
        self.globally_unseen_word_prob
    }

    pub fn num_unseen_word_types(&self) -> usize {
        self.num_unseen_word_types
    }

    pub fn global_count(&self, word: &str) -> Option<u64> {
        self.global_counts.get(word).copied()
    }

    /// The global probability of a word seen in training.
    pub fn overall_word_prob(&self, word: &str) -> Option<Probability> {
        self.overall_word_probs.get(word).copied()
    }

    /// Probability of a single never seen word before scaling with the unseen mass of a distribution.
    pub(crate) fn unseen_word_share(&self) -> Probability {
        if self.num_unseen_word_types == 0 {
            0.0
        } else {
            self.globally_unseen_word_prob / self.num_unseen_word_types as f64
        }
    }
}
