use std::cmp::Reverse;
use std::collections::HashSet;
use itertools::Itertools;
use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use geogrounder_toolkit::text::is_capitalized;
use geogrounder_worddist::naive_bayes::nbayes_logprob;
use geogrounder_worddist::{CosineExt, DivergenceExt, Word, WordDist, WordDistError};
use crate::config::{BaselineStrategyName, NaiveBayesWeighting, StrategyName};
use crate::context::GeoContext;
use crate::grid::RegionIndices;
use crate::strategy::make_rng;

/// Regions from the best to the worst, each with the value it was ranked by.
pub type RankedRegions = Vec<(RegionIndices, f64)>;

/// Ranks the statistical regions for the distribution of a document.
#[derive(Debug)]
pub enum DocumentStrategy {
    /// Ignores the words, except for the most-common-toponym variants.
    Baseline {
        baseline: BaselineStrategyName,
        rng: StdRng,
        popular: Option<RankedRegions>,
    },
    /// Ascending by the KL divergence from the document to the region.
    KlDivergence {
        partial: bool,
        symmetric: bool,
    },
    /// Ascending by `1.002 - cosine similarity`.
    CosineSimilarity {
        smoothed: bool,
        partial: bool,
    },
    /// Descending by the naive bayes log probability of the document.
    NaiveBayes {
        use_baseline: bool,
    },
    /// Descending by the averaged region distributions of the words.
    AverageCellProbability,
}

impl DocumentStrategy {
    pub fn baseline(baseline: BaselineStrategyName, seed: Option<u64>) -> Self {
        Self::Baseline { baseline, rng: make_rng(seed), popular: None }
    }

    /// The strategy for a name, `None` for [StrategyName::None].
    pub fn from_name(name: StrategyName, baseline: BaselineStrategyName, seed: Option<u64>) -> Option<Self> {
        let strategy = match name {
            StrategyName::None => return None,
            StrategyName::Baseline => Self::baseline(baseline, seed),
            StrategyName::FullKlDivergence => Self::KlDivergence { partial: false, symmetric: false },
            StrategyName::PartialKlDivergence => Self::KlDivergence { partial: true, symmetric: false },
            StrategyName::SymmetricFullKlDivergence => Self::KlDivergence { partial: false, symmetric: true },
            StrategyName::SymmetricPartialKlDivergence => Self::KlDivergence { partial: true, symmetric: true },
            StrategyName::CosineSimilarity => Self::CosineSimilarity { smoothed: false, partial: false },
            StrategyName::PartialCosineSimilarity => Self::CosineSimilarity { smoothed: false, partial: true },
            StrategyName::SmoothedCosineSimilarity => Self::CosineSimilarity { smoothed: true, partial: false },
            StrategyName::SmoothedPartialCosineSimilarity => Self::CosineSimilarity { smoothed: true, partial: true },
            StrategyName::AverageCellProbability => Self::AverageCellProbability,
            StrategyName::NaiveBayesWithBaseline => Self::NaiveBayes { use_baseline: true },
            StrategyName::NaiveBayesNoBaseline => Self::NaiveBayes { use_baseline: false },
        };
        Some(strategy)
    }

    pub fn ranked_regions(&mut self, ctx: &GeoContext, doc: &WordDist) -> Result<RankedRegions, WordDistError> {
        let ranked = match self {
            Self::Baseline { baseline, rng, popular } => match baseline {
                BaselineStrategyName::Random => random_regions(ctx, rng),
                BaselineStrategyName::LinkMostCommonToponym => link_most_common_toponym(ctx, doc, rng),
                BaselineStrategyName::RegdistMostCommonToponym => regdist_most_common_toponym(ctx, doc),
                BaselineStrategyName::InternalLink | BaselineStrategyName::NumArticles => {
                    popular.get_or_insert_with(|| most_popular_regions(ctx, *baseline)).clone()
                }
            },
            Self::KlDivergence { partial, symmetric } => {
                let mut ranked = Vec::new();
                for region in ctx.regions.iter_nonempty_regions(true) {
                    let Some(indices) = region.indices else { continue };
                    let other = &region.worddist.dist;
                    let kl = if *symmetric {
                        doc.symmetric_kl_divergence(&ctx.stats, other, *partial)?
                    } else {
                        doc.fast_kl_divergence(&ctx.stats, other, *partial)?
                    };
                    ranked.push((indices, kl));
                }
                ranked.sort_by_key(|(_, kl)| OrderedFloat(*kl));
                ranked
            }
            Self::CosineSimilarity { smoothed, partial } => {
                let mut ranked = Vec::new();
                for region in ctx.regions.iter_nonempty_regions(true) {
                    let Some(indices) = region.indices else { continue };
                    let other = &region.worddist.dist;
                    let cossim = if *smoothed {
                        doc.smoothed_cosine_similarity(&ctx.stats, other, *partial)?
                    } else {
                        doc.cosine_similarity(other, *partial)?
                    };
                    if !(0.0..=1.002).contains(&cossim) {
                        log::warn!("Cosine similarity {cossim} out of range for region {indices:?}");
                    }
                    ranked.push((indices, 1.002 - cossim));
                }
                ranked.sort_by_key(|(_, value)| OrderedFloat(*value));
                ranked
            }
            Self::NaiveBayes { use_baseline } => naive_bayes_regions(ctx, doc, *use_baseline),
            Self::AverageCellProbability => ctx.region_dist_for_word_dist(doc).ranked_regions(),
        };
        Ok(ranked)
    }
}

fn random_regions(ctx: &GeoContext, rng: &mut StdRng) -> RankedRegions {
    let mut regions = ctx.regions
        .iter_nonempty_regions(false)
        .filter_map(|region| region.indices)
        .map(|indices| (indices, 0.0))
        .collect_vec();
    regions.shuffle(rng);
    regions
}

fn most_popular_regions(ctx: &GeoContext, baseline: BaselineStrategyName) -> RankedRegions {
    let mut regions = ctx.regions
        .iter_nonempty_regions(false)
        .filter_map(|region| {
            let popularity = if baseline == BaselineStrategyName::InternalLink {
                region.worddist.adjusted_incoming_links()
            } else {
                region.worddist.num_arts_for_links as f64
            };
            region.indices.map(|indices| (indices, popularity))
        })
        .collect_vec();
    regions.sort_by_key(|(_, popularity)| Reverse(OrderedFloat(*popularity)));
    regions
}

fn capitalized_toponym(ctx: &GeoContext) -> impl Fn(&str) -> bool + '_ {
    move |word: &str| is_capitalized(word) && ctx.word_is_toponym(word)
}

/// The regions of the candidates of the most common toponym, by their links,
/// followed by the remaining regions in random order.
fn link_most_common_toponym(ctx: &GeoContext, doc: &WordDist, rng: &mut StdRng) -> RankedRegions {
    let maxword = doc
        .most_common_word_where(capitalized_toponym(ctx))
        .or_else(|| doc.most_common_word_where(|word| ctx.word_is_toponym(word)));
    log::debug!("  maxword = {maxword:?}");

    let mut candidates = Vec::new();
    if let Some(ref maxword) = maxword {
        let mut cands = ctx.construct_candidates(maxword)
            .into_iter()
            .map(|cand| (cand, ctx.articles.get(cand).adjusted_incoming_links()))
            .collect_vec();
        cands.sort_by_key(|(_, links)| Reverse(OrderedFloat(*links)));
        for (cand, links) in cands {
            let art = ctx.articles.get(cand);
            let region = match art.coord {
                Some(ref coord) => ctx.regions.region_for_coord(coord),
                None => ctx.regions.empty_region(),
            };
            match region.indices {
                Some(indices) => candidates.push((indices, links)),
                None => log::warn!("Strange, found no region for candidate {art}"),
            }
        }
    }

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .chain(random_regions(ctx, rng))
        .filter(|(indices, _)| seen.insert(*indices))
        .collect()
}

/// The region distribution of the most common toponym, else of the most common
/// capitalized word, else of the most common word.
fn regdist_most_common_toponym(ctx: &GeoContext, doc: &WordDist) -> RankedRegions {
    let maxword: Option<Word> = doc
        .most_common_word_where(capitalized_toponym(ctx))
        .or_else(|| doc.most_common_word_where(is_capitalized))
        .or_else(|| doc.most_common_word_where(|_| true));
    match maxword {
        Some(word) => ctx.region_dist_for_word(&word).ranked_regions(),
        None => Vec::new(),
    }
}

fn naive_bayes_regions(ctx: &GeoContext, doc: &WordDist, use_baseline: bool) -> RankedRegions {
    let config = &ctx.config;
    let (word_weight, baseline_weight) = if !use_baseline {
        (1.0, 0.0)
    } else if config.naive_bayes_weighting == NaiveBayesWeighting::Equal {
        (1.0, 1.0)
    } else {
        let tokens = doc.total_tokens().max(1) as f64;
        ((1.0 - config.baseline_weight) / tokens, config.baseline_weight)
    };
    let total_arts = ctx.regions.total_num_arts_for_links() as f64;
    let mut ranked = ctx.regions
        .iter_nonempty_regions(true)
        .filter_map(|region| {
            let word_logprob = nbayes_logprob(&ctx.stats, &region.worddist.dist, doc);
            let baseline_logprob = (region.worddist.num_arts_for_links as f64 / total_arts).ln();
            let logprob = word_weight * word_logprob + baseline_weight * baseline_logprob;
            region.indices.map(|indices| (indices, logprob))
        })
        .collect_vec();
    ranked.sort_by_key(|(_, logprob)| Reverse(OrderedFloat(*logprob)));
    ranked
}

#[cfg(test)]
mod test {
    use arcstr::ArcStr;
    use itertools::Itertools;
    use geogrounder_worddist::WordDist;
    use crate::config::{BaselineStrategyName, GeotagConfig, NaiveBayesWeighting, StrategyName};
    use crate::context::test::context;
    use crate::context::GeoContext;
    use crate::strategy::document::DocumentStrategy;

    const PARIS: (i32, i32) = (9, 0);
    const BERLIN: (i32, i32) = (10, 2);
    const TUCSON: (i32, i32) = (6, -23);

    fn doc(ctx: &mut GeoContext, counts: &[(&str, u64)]) -> WordDist {
        let counts = counts.iter().map(|(w, c)| (ArcStr::from(*w), *c)).collect_vec();
        let mut dist = WordDist::from_counts(&mut ctx.stats, counts, false).unwrap();
        dist.finish(&ctx.stats, 1).unwrap();
        dist
    }

    fn best(strategy: &mut DocumentStrategy, ctx: &GeoContext, dist: &WordDist) -> (i32, i32) {
        strategy.ranked_regions(ctx, dist).unwrap()[0].0
    }

    #[test]
    fn word_based_strategies_find_the_region(){
        let mut ctx = context(GeotagConfig::default());
        let berlin_doc = doc(&mut ctx, &[("berlin", 5), ("germany", 3), ("wall", 1)]);
        let desert_doc = doc(&mut ctx, &[("desert", 4), ("arizona", 2)]);
        for name in [
            StrategyName::PartialKlDivergence,
            StrategyName::FullKlDivergence,
            StrategyName::SymmetricPartialKlDivergence,
            StrategyName::CosineSimilarity,
            StrategyName::SmoothedPartialCosineSimilarity,
            StrategyName::NaiveBayesNoBaseline,
            StrategyName::AverageCellProbability,
        ] {
            let mut strategy = DocumentStrategy::from_name(name, BaselineStrategyName::InternalLink, Some(3)).unwrap();
            assert_eq!(BERLIN, best(&mut strategy, &ctx, &berlin_doc), "{name}");
            assert_eq!(TUCSON, best(&mut strategy, &ctx, &desert_doc), "{name}");
            assert_eq!(3, strategy.ranked_regions(&ctx, &berlin_doc).unwrap().len());
        }
        assert!(DocumentStrategy::from_name(StrategyName::None, BaselineStrategyName::InternalLink, None).is_none());
    }

    #[test]
    fn naive_bayes_with_weighted_baseline(){
        let mut ctx = context(GeotagConfig {
            naive_bayes_weighting: NaiveBayesWeighting::EqualWords,
            baseline_weight: 0.1,
            ..Default::default()
        });
        let desert_doc = doc(&mut ctx, &[("desert", 4), ("arizona", 2)]);
        let mut strategy = DocumentStrategy::NaiveBayes { use_baseline: true };
        assert_eq!(TUCSON, best(&mut strategy, &ctx, &desert_doc));
    }

    #[test]
    fn popularity_baselines(){
        let mut ctx = context(GeotagConfig::default());
        let dist = doc(&mut ctx, &[("desert", 1)]);
        let mut links = DocumentStrategy::baseline(BaselineStrategyName::InternalLink, Some(1));
        let ranked = links.ranked_regions(&ctx, &dist).unwrap();
        assert_eq!(vec![PARIS, BERLIN, TUCSON], ranked.iter().map(|(r, _)| *r).collect_vec());
        assert!(matches!(links, DocumentStrategy::Baseline { popular: Some(_), .. }));

        let mut arts = DocumentStrategy::baseline(BaselineStrategyName::NumArticles, Some(1));
        let ranked = arts.ranked_regions(&ctx, &dist).unwrap();
        assert_eq!(PARIS, ranked[0].0);
        assert_eq!(4.0, ranked[0].1);

        let mut random = DocumentStrategy::baseline(BaselineStrategyName::Random, Some(1));
        let mut ranked = random.ranked_regions(&ctx, &dist).unwrap().into_iter().map(|(r, _)| r).collect_vec();
        ranked.sort();
        assert_eq!(vec![TUCSON, PARIS, BERLIN], ranked);
    }

    #[test]
    fn most_common_toponym_baselines(){
        let mut ctx = context(GeotagConfig { preserve_case_words: true, ..Default::default() });
        let dist = doc(&mut ctx, &[("Tucson", 2), ("Paris", 1), ("desert", 7)]);
        let mut link = DocumentStrategy::baseline(BaselineStrategyName::LinkMostCommonToponym, Some(5));
        let ranked = link.ranked_regions(&ctx, &dist).unwrap();
        assert_eq!(TUCSON, ranked[0].0);
        assert_eq!(3, ranked.len());

        let mut regdist = DocumentStrategy::baseline(BaselineStrategyName::RegdistMostCommonToponym, Some(5));
        let without_toponym = doc(&mut ctx, &[("Wall", 1), ("desert", 3)]);
        // no toponym, the most common capitalized word is used
        let ranked = regdist.ranked_regions(&ctx, &without_toponym).unwrap();
        assert!(ranked.len() <= 3);
    }
}
