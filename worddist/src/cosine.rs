use std::collections::HashSet;
use sealed::sealed;
use crate::corpus::CorpusStatistics;
use crate::dist::WordDist;
use crate::errors::WordDistError;

/// Cosine similarity between two distributions.
///
/// The partial variants range over the words of `self`, the full variants over
/// the words of both distributions. Both vectors are normalised over the same words.
#[sealed]
pub trait CosineExt {
    /// Similarity of the relative frequencies.
    fn cosine_similarity(&self, other: &WordDist, partial: bool) -> Result<f64, WordDistError>;

    /// Similarity of the smoothed probabilities.
    fn smoothed_cosine_similarity(&self, stats: &CorpusStatistics, other: &WordDist, partial: bool) -> Result<f64, WordDistError>;
}

fn cosine_over<'a>(words: impl Iterator<Item = &'a str>, mut value: impl FnMut(&str) -> (f64, f64)) -> f64 {
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for word in words {
        let (a, b) = value(word);
        dot += a * b;
        norm_a += a * a;
        norm_b += b * b;
    }
    if norm_a <= 0.0 || norm_b <= 0.0 {
        0.0
    } else {
        dot / (norm_a.sqrt() * norm_b.sqrt())
    }
}

fn words_of<'a>(a: &'a WordDist, b: &'a WordDist, partial: bool) -> Vec<&'a str> {
    if partial {
        a.counts().words().map(|w| w.as_str()).collect()
    } else {
        let mut seen = HashSet::new();
        a.counts()
            .words()
            .chain(b.counts().words())
            .map(|w| w.as_str())
            .filter(|w| seen.insert(*w))
            .collect()
    }
}

#[sealed]
impl CosineExt for WordDist {
    fn cosine_similarity(&self, other: &WordDist, partial: bool) -> Result<f64, WordDistError> {
        let words = words_of(self, other, partial);
        Ok(cosine_over(words.into_iter(), |w| (self.relative_frequency(w), other.relative_frequency(w))))
    }

    fn smoothed_cosine_similarity(&self, stats: &CorpusStatistics, other: &WordDist, partial: bool) -> Result<f64, WordDistError> {
        if !self.is_finished() || !other.is_finished() {
            return Err(WordDistError::Unfinished);
        }
        let words = words_of(self, other, partial);
        Ok(cosine_over(words.into_iter(), |w| (self.lookup_word(stats, w), other.lookup_word(stats, w))))
    }
}
