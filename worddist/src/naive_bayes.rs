use crate::corpus::CorpusStatistics;
use crate::dist::WordDist;

/// `log p(doc | dist)` under a Naive Bayes model, each distinct word of the
/// document counts once. Words without probability are skipped.
pub fn nbayes_logprob(stats: &CorpusStatistics, dist: &WordDist, doc: &WordDist) -> f64 {
    let mut logprob = 0.0;
    for word in doc.counts().words() {
        let value = dist.lookup_word(stats, word);
        if value <= 0.0 {
            log::warn!("For word {word}, prob {value} out of range");
        } else {
            logprob += value.ln();
        }
    }
    logprob
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;
    use crate::corpus::CorpusStatistics;
    use crate::dist::test::dist_of;
    use crate::naive_bayes::nbayes_logprob;

    #[test]
    fn sums_log_lookups(){
        let mut stats = CorpusStatistics::new();
        let mut region = dist_of(&mut stats, &[("paris", 5), ("france", 3), ("eiffel", 1)], true);
        stats.finish_global_distribution();
        region.finish(&stats, 1).unwrap();
        let doc = dist_of(&mut stats, &[("paris", 4), ("france", 1)], false);
        let expected = region.lookup_word(&stats, "paris").ln() + region.lookup_word(&stats, "france").ln();
        assert_relative_eq!(expected, nbayes_logprob(&stats, &region, &doc));
    }
}
