use std::cell::RefCell;
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::rc::Rc;
use lru::LruCache;
use geogrounder_worddist::{CorpusStatistics, Probability, Word, WordDist};
use crate::grid::RegionIndices;
use crate::region::StatRegionTable;

/// A distribution over the statistical regions, by default the probability of
/// each region given a word.
#[derive(Debug, Clone, Default)]
pub struct RegionDist {
    /// Empty for distributions that are not computed for a single word.
    pub word: String,
    /// The probability of every region, ordered by the region indices.
    pub region_probs: Vec<(RegionIndices, Probability)>,
    /// False if every probability was 0, the values are unnormalized then.
    pub normalized: bool,
}

impl RegionDist {
    fn from_probs(word: String, mut region_probs: Vec<(RegionIndices, Probability)>) -> Self {
        let total: Probability = region_probs.iter().map(|(_, p)| *p).sum();
        let normalized = total != 0.0;
        if normalized {
            for (_, prob) in region_probs.iter_mut() {
                *prob /= total;
            }
        }
        Self { word, region_probs, normalized }
    }

    /// Looks up the word in every region with a non-empty distribution.
    pub fn for_word(word: &str, regions: &StatRegionTable, stats: &CorpusStatistics) -> Self {
        let probs = regions
            .iter_nonempty_regions(true)
            .filter_map(|region| {
                region.indices.map(|indices| (indices, region.worddist.dist.lookup_word(stats, word)))
            })
            .collect();
        Self::from_probs(word.to_string(), probs)
    }

    /// The distribution for a whole document: the distributions of its words
    /// weighted by their counts.
    pub fn for_word_dist(dist: &WordDist, cache: &RegionDistCache, regions: &StatRegionTable, stats: &CorpusStatistics) -> Self {
        let mut probs: BTreeMap<RegionIndices, Probability> = BTreeMap::new();
        for (word, count) in dist.counts().iter() {
            let word_dist = cache.get(word, regions, stats);
            for (indices, prob) in word_dist.region_probs.iter() {
                *probs.entry(*indices).or_default() += count as f64 * prob;
            }
        }
        Self::from_probs(String::new(), probs.into_iter().collect())
    }

    /// The regions from the most to the least probable.
    pub fn ranked_regions(&self) -> Vec<(RegionIndices, Probability)> {
        let mut ranked = self.region_probs.clone();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

/// Remembers the distributions of the most recently used words.
pub struct RegionDistCache {
    cache: RefCell<LruCache<Word, Rc<RegionDist>>>,
}

impl RegionDistCache {
    pub const DEFAULT_CAPACITY: usize = 400;

    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self { cache: RefCell::new(LruCache::new(capacity)) }
    }

    pub fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.borrow().is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.cache.borrow().contains(word)
    }

    /// The distribution for `word`, computed if it is not cached.
    pub fn get(&self, word: &Word, regions: &StatRegionTable, stats: &CorpusStatistics) -> Rc<RegionDist> {
        if let Some(found) = self.cache.borrow_mut().get(word) {
            return found.clone();
        }
        let dist = Rc::new(RegionDist::for_word(word, regions, stats));
        self.cache.borrow_mut().put(word.clone(), dist.clone());
        dist
    }
}

impl Default for RegionDistCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for RegionDistCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionDistCache")
            .field("len", &self.len())
            .field("cap", &self.cache.borrow().cap())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;
    use arcstr::ArcStr;
    use geogrounder_worddist::WordDist;
    use crate::region::test::world;
    use crate::region_dist::{RegionDist, RegionDistCache};

    #[test]
    fn word_distributions_are_normalized(){
        let (mut table, stats, mut regions) = world(1);
        regions.initialize_regions(&mut table, &stats, false).unwrap();

        let france = RegionDist::for_word("france", &regions, &stats);
        assert!(france.normalized);
        assert_eq!(3, france.region_probs.len());
        let total: f64 = france.region_probs.iter().map(|(_, p)| p).sum();
        assert_relative_eq!(1.0, total, epsilon = 1e-9);
        let ranked = france.ranked_regions();
        assert_eq!((9, 0), ranked[0].0);
        assert!(ranked.windows(2).all(|w| w[0].1 >= w[1].1));

        let berlin = RegionDist::for_word("berlin", &regions, &stats);
        assert_eq!((10, 2), berlin.ranked_regions()[0].0);
    }

    #[test]
    fn cache_evicts_least_recently_used(){
        let (mut table, stats, mut regions) = world(1);
        regions.initialize_regions(&mut table, &stats, false).unwrap();
        let cache = RegionDistCache::new(2);
        let paris = ArcStr::from("paris");
        let lyon = ArcStr::from("lyon");
        let desert = ArcStr::from("desert");
        let first = cache.get(&paris, &regions, &stats);
        cache.get(&lyon, &regions, &stats);
        let again = cache.get(&paris, &regions, &stats);
        assert!(std::rc::Rc::ptr_eq(&first, &again));
        cache.get(&desert, &regions, &stats);
        assert_eq!(2, cache.len());
        assert!(cache.contains("paris"));
        assert!(!cache.contains("lyon"));
        assert!(cache.contains("desert"));
    }

    #[test]
    fn document_distribution_weights_words(){
        let (mut table, mut stats, mut regions) = world(1);
        regions.initialize_regions(&mut table, &stats, false).unwrap();
        let counts = [(ArcStr::from("desert"), 3), (ArcStr::from("arizona"), 1)];
        let doc = WordDist::from_counts(&mut stats, counts, false).unwrap();
        let cache = RegionDistCache::default();
        let dist = RegionDist::for_word_dist(&doc, &cache, &regions, &stats);
        assert!(dist.normalized);
        assert!(dist.word.is_empty());
        assert_eq!((6, -23), dist.ranked_regions()[0].0);
        let total: f64 = dist.region_probs.iter().map(|(_, p)| p).sum();
        assert_relative_eq!(1.0, total, epsilon = 1e-9);
        assert_eq!(2, cache.len());
    }
}
