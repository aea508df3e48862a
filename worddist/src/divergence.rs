use std::collections::HashMap;
use sealed::sealed;
use crate::corpus::CorpusStatistics;
use crate::dist::WordDist;
use crate::errors::WordDistError;
use crate::Word;

/// Maximum difference tolerated between [DivergenceExt::fast_kl_divergence] and
/// [DivergenceExt::slow_kl_divergence].
pub const KL_TOLERANCE: f64 = 1e-8;

/// Kullback-Leibler divergence between two smoothed distributions.
///
/// The vocabulary falls into four disjoint groups:
/// 1. words in `self`,
/// 2. words in `other` but not in `self`,
/// 3. words seen in the corpus but in neither distribution,
/// 4. words never seen in the corpus.
///
/// Groups 3 and 4 have a closed form, so the global vocabulary is never enumerated.
/// A partial divergence only sums group 1.
///
/// See <https://en.wikipedia.org/wiki/Kullback%E2%80%93Leibler_divergence>
#[sealed]
pub trait DivergenceExt {
    /// Computes the divergence with [WordDist::lookup_word] for every word.
    fn slow_kl_divergence(&self, stats: &CorpusStatistics, other: &WordDist, partial: bool) -> Result<f64, WordDistError>;

    /// Like [DivergenceExt::slow_kl_divergence] but also returns the contribution of every word of group 1 and 2.
    fn slow_kl_divergence_with_contributions(&self, stats: &CorpusStatistics, other: &WordDist, partial: bool) -> Result<(f64, HashMap<Word, f64>), WordDistError>;

    /// Computes the divergence in a single pass with the precomputed scale factors of both distributions.
    fn fast_kl_divergence(&self, stats: &CorpusStatistics, other: &WordDist, partial: bool) -> Result<f64, WordDistError>;

    /// The average of the divergence in both directions.
    fn symmetric_kl_divergence(&self, stats: &CorpusStatistics, other: &WordDist, partial: bool) -> Result<f64, WordDistError>;

    /// Computes both versions and fails if they disagree.
    fn test_kl_divergence(&self, stats: &CorpusStatistics, other: &WordDist, partial: bool) -> Result<f64, WordDistError>;
}

fn check_finished(a: &WordDist, b: &WordDist) -> Result<(), WordDistError> {
    if a.is_finished() && b.is_finished() {
        Ok(())
    } else {
        Err(WordDistError::Unfinished)
    }
}

fn kl_term(word: &str, p: f64, q: f64) -> Option<f64> {
    if p <= 0.0 || q <= 0.0 {
        log::warn!("Skipping word {word:?} with p = {p} and q = {q} out of range");
        None
    } else {
        Some(p * (p.ln() - q.ln()))
    }
}

/// Contribution of group 3 and 4, `other_mass` is the global probability of group 2.
fn closed_form_terms(stats: &CorpusStatistics, a: &WordDist, b: &WordDist, other_mass: f64) -> f64 {
    let mut kl = 0.0;

    let (um_a, oum_a) = (a.unseen_mass(), a.overall_unseen_mass());
    let (um_b, oum_b) = (b.unseen_mass(), b.overall_unseen_mass());
    if um_a > 0.0 && oum_a > 0.0 && um_b > 0.0 && oum_b > 0.0 {
        let factor1 = (um_a.ln() - oum_a.ln()) - (um_b.ln() - oum_b.ln());
        let factor2 = um_a / oum_a * factor1;
        kl += factor2 * (oum_a - other_mass);
    }

    let num_unseen = stats.num_unseen_word_types() as f64;
    let p = a.never_seen_prob(stats);
    let q = b.never_seen_prob(stats);
    if p > 0.0 && q > 0.0 {
        kl += num_unseen * p * (p.ln() - q.ln());
    }
    kl
}

fn slow_impl(
    a: &WordDist,
    stats: &CorpusStatistics,
    b: &WordDist,
    partial: bool,
    mut contributions: Option<&mut HashMap<Word, f64>>,
) -> Result<f64, WordDistError> {
    check_finished(a, b)?;
    let mut kl = 0.0;
    for word in a.counts().words() {
        let p = a.lookup_word(stats, word);
        let q = b.lookup_word(stats, word);
        if let Some(term) = kl_term(word, p, q) {
            kl += term;
            if let Some(contributions) = contributions.as_deref_mut() {
                contributions.insert(word.clone(), term);
            }
        }
    }
    if partial {
        return Ok(kl);
    }

    let mut other_mass = 0.0;
    for word in b.counts().words().filter(|w| !a.counts().contains(w)) {
        let p = a.lookup_word(stats, word);
        let q = b.lookup_word(stats, word);
        if let Some(term) = kl_term(word, p, q) {
            kl += term;
            if let Some(contributions) = contributions.as_deref_mut() {
                contributions.insert(word.clone(), term);
            }
        }
        other_mass += stats.overall_word_prob(word).unwrap_or(0.0);
    }

    Ok(kl + closed_form_terms(stats, a, b, other_mass))
}

#[sealed]
impl DivergenceExt for WordDist {
    fn slow_kl_divergence(&self, stats: &CorpusStatistics, other: &WordDist, partial: bool) -> Result<f64, WordDistError> {
        slow_impl(self, stats, other, partial, None)
    }

    fn slow_kl_divergence_with_contributions(&self, stats: &CorpusStatistics, other: &WordDist, partial: bool) -> Result<(f64, HashMap<Word, f64>), WordDistError> {
        let mut contributions = HashMap::new();
        let kl = slow_impl(self, stats, other, partial, Some(&mut contributions))?;
        Ok((kl, contributions))
    }

    fn fast_kl_divergence(&self, stats: &CorpusStatistics, other: &WordDist, partial: bool) -> Result<f64, WordDistError> {
        check_finished(self, other)?;
        let seen_a = self.seen_factor();
        let seen_b = other.seen_factor();
        let global_a = self.globally_seen_factor();
        let global_b = other.globally_seen_factor();
        let unseen_a = self.never_seen_prob(stats);
        let unseen_b = other.never_seen_prob(stats);

        let mut kl = 0.0;
        for (word, count) in self.counts().iter() {
            let p = count as f64 * seen_a;
            let q = match other.count(word) {
                Some(other_count) => other_count as f64 * seen_b,
                None => stats.overall_word_prob(word).map_or(unseen_b, |owp| owp * global_b),
            };
            if let Some(term) = kl_term(word, p, q) {
                kl += term;
            }
        }
        if partial {
            return Ok(kl);
        }

        let mut other_mass = 0.0;
        for (word, count) in other.counts().iter() {
            if self.counts().contains(word) {
                continue;
            }
            let owp = stats.overall_word_prob(word);
            let p = owp.map_or(unseen_a, |owp| owp * global_a);
            let q = count as f64 * seen_b;
            if let Some(term) = kl_term(word, p, q) {
                kl += term;
            }
            other_mass += owp.unwrap_or(0.0);
        }

        Ok(kl + closed_form_terms(stats, self, other, other_mass))
    }

    fn symmetric_kl_divergence(&self, stats: &CorpusStatistics, other: &WordDist, partial: bool) -> Result<f64, WordDistError> {
        let there = self.fast_kl_divergence(stats, other, partial)?;
        let back = other.fast_kl_divergence(stats, self, partial)?;
        Ok((there + back) / 2.0)
    }

    fn test_kl_divergence(&self, stats: &CorpusStatistics, other: &WordDist, partial: bool) -> Result<f64, WordDistError> {
        let fast = self.fast_kl_divergence(stats, other, partial)?;
        let slow = self.slow_kl_divergence(stats, other, partial)?;
        if (fast - slow).abs() > KL_TOLERANCE {
            log::warn!("Fast KL divergence {fast} differs from slow KL divergence {slow}");
            return Err(WordDistError::KlMismatch { fast, slow, tolerance: KL_TOLERANCE });
        }
        Ok(fast)
    }
}

#[cfg(test)]
mod test {
    use approx::assert_abs_diff_eq;
    use arcstr::ArcStr;
    use rand::prelude::*;
    use crate::corpus::CorpusStatistics;
    use crate::dist::test::dist_of;
    use crate::dist::WordDist;
    use crate::divergence::{DivergenceExt, KL_TOLERANCE};
    use crate::errors::WordDistError;

    const VOCABULARY: [&str; 12] = [
        "paris", "france", "eiffel", "tower", "london", "thames", "river", "bridge", "city", "museum", "river", "seine"
    ];

    fn random_world(seed: u64) -> (CorpusStatistics, Vec<WordDist>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut stats = CorpusStatistics::new();
        let mut dists = Vec::new();
        for _ in 0..6 {
            let counts = VOCABULARY
                .iter()
                .filter_map(|w| {
                    if rng.random::<f64>() < 0.6 {
                        Some((ArcStr::from(*w), rng.random_range(1..6u64)))
                    } else {
                        None
                    }
                })
                .collect::<Vec<_>>();
            dists.push(WordDist::from_counts(&mut stats, counts, true).unwrap());
        }
        // a document only partially known to the corpus
        dists.push(dist_of(&mut stats, &[("paris", 2), ("louvre", 1), ("seine", 1)], false));
        stats.finish_global_distribution();
        for dist in dists.iter_mut() {
            dist.finish(&stats, 1).unwrap();
        }
        (stats, dists)
    }

    #[test]
    fn self_divergence_is_zero(){
        let (stats, dists) = random_world(1);
        for dist in dists.iter().filter(|d| d.total_tokens() > 0) {
            assert_abs_diff_eq!(0.0, dist.fast_kl_divergence(&stats, dist, false).unwrap(), epsilon = 1e-10);
            assert_abs_diff_eq!(0.0, dist.symmetric_kl_divergence(&stats, dist, true).unwrap(), epsilon = 1e-10);
        }
    }

    #[test]
    fn fast_and_slow_agree(){
        let _ = env_logger::builder().is_test(true).try_init();
        for seed in 0..5 {
            let (stats, dists) = random_world(seed);
            for a in dists.iter() {
                for b in dists.iter() {
                    for partial in [true, false] {
                        let fast = a.fast_kl_divergence(&stats, b, partial).unwrap();
                        let slow = a.slow_kl_divergence(&stats, b, partial).unwrap();
                        assert_abs_diff_eq!(fast, slow, epsilon = KL_TOLERANCE);
                        assert!(a.test_kl_divergence(&stats, b, partial).is_ok());
                    }
                }
            }
        }
    }

    #[test]
    fn divergence_is_positive_between_different_dists(){
        let mut stats = CorpusStatistics::new();
        let mut a = dist_of(&mut stats, &[("paris", 5), ("france", 3), ("eiffel", 1)], true);
        let mut b = dist_of(&mut stats, &[("london", 5), ("thames", 3), ("paris", 1)], true);
        stats.finish_global_distribution();
        a.finish(&stats, 1).unwrap();
        b.finish(&stats, 1).unwrap();
        let full = a.fast_kl_divergence(&stats, &b, false).unwrap();
        assert!(full > 0.0);
        let (slow, contributions) = a.slow_kl_divergence_with_contributions(&stats, &b, false).unwrap();
        assert_abs_diff_eq!(full, slow, epsilon = KL_TOLERANCE);
        assert_eq!(5, contributions.len());
        assert!(contributions["paris"] > 0.0);
    }

    #[test]
    fn unfinished_is_rejected(){
        let mut stats = CorpusStatistics::new();
        let a = dist_of(&mut stats, &[("paris", 5)], true);
        assert_eq!(Err(WordDistError::Unfinished), a.fast_kl_divergence(&stats, &a, false));
    }
}
