use rand::rngs::StdRng;
use rand::Rng;
use crate::article::ArticleId;
use crate::config::{BaselineStrategyName, ContextType, NaiveBayesWeighting, StrategyName};
use crate::context::GeoContext;
use crate::errors::ConfigError;
use crate::gazetteer::LocationRef;
use crate::strategy::{make_rng, naive_bayes_weights};

/// Scores a candidate article of a toponym, the best score wins.
#[derive(Debug)]
pub enum ToponymStrategy {
    /// Scores by popularity, independent of the text.
    Baseline {
        baseline: BaselineStrategyName,
        rng: StdRng,
    },
    /// Scores by the probability of the words around the toponym, optionally
    /// combined with the links of the candidate.
    NaiveBayes {
        use_baseline: bool,
    },
}

impl ToponymStrategy {
    pub fn baseline(baseline: BaselineStrategyName, seed: Option<u64>) -> Self {
        Self::Baseline { baseline, rng: make_rng(seed) }
    }

    pub fn naive_bayes(use_baseline: bool) -> Self {
        Self::NaiveBayes { use_baseline }
    }

    /// The strategy for a name given on the command line.
    pub fn from_name(name: StrategyName, baseline: BaselineStrategyName, seed: Option<u64>) -> Result<Self, ConfigError> {
        match name {
            StrategyName::Baseline => Ok(Self::baseline(baseline, seed)),
            StrategyName::NaiveBayesWithBaseline => Ok(Self::naive_bayes(true)),
            StrategyName::NaiveBayesNoBaseline => Ok(Self::naive_bayes(false)),
            other => Err(ConfigError::Incompatible(format!(
                "Strategy {other} is only compatible with --mode=geotag-documents"
            ))),
        }
    }

    /// True if the words around a toponym are needed.
    pub fn need_context(&self) -> bool {
        matches!(self, Self::NaiveBayes { .. })
    }

    /// `context` holds the words around the toponym with their distance to it.
    pub fn compute_score(&mut self, ctx: &GeoContext, context: &[(usize, String)], art: ArticleId) -> f64 {
        match self {
            Self::Baseline { baseline, rng } => baseline_score(ctx, *baseline, rng, art),
            Self::NaiveBayes { use_baseline } => naive_bayes_score(ctx, *use_baseline, context, art),
        }
    }
}

fn baseline_score(ctx: &GeoContext, baseline: BaselineStrategyName, rng: &mut StdRng, art: ArticleId) -> f64 {
    let by_region = ctx.config.context_type == ContextType::Region;
    match baseline {
        BaselineStrategyName::InternalLink => {
            if by_region {
                ctx.article_region_worddist(art).adjusted_incoming_links()
            } else {
                ctx.articles.get(art).adjusted_incoming_links()
            }
        }
        BaselineStrategyName::NumArticles => {
            if by_region {
                ctx.article_region_worddist(art).num_arts_for_links as f64
            } else {
                match ctx.articles.get(art).location {
                    Some(LocationRef::Division(div)) => ctx.gazetteer.division(div).locs.len() as f64,
                    _ => 1.0,
                }
            }
        }
        _ => rng.random::<f64>(),
    }
}

fn naive_bayes_score(ctx: &GeoContext, use_baseline: bool, context: &[(usize, String)], art: ArticleId) -> f64 {
    let config = &ctx.config;
    // the prior is always the link count of the article
    let links = ctx.articles.get(art).adjusted_incoming_links();
    let dist = match config.context_type {
        ContextType::Article => ctx.articles.get(art).dist.as_ref().unwrap_or(&ctx.regions.empty_region().worddist.dist),
        _ => &ctx.article_region_worddist(art).dist,
    };
    let (word_weight, baseline_weight) = naive_bayes_weights(use_baseline, config.naive_bayes_weighting, config.baseline_weight);

    let mut total_prob = 0.0;
    let mut total_word_weight = 0.0;
    for (distance, word) in context {
        let prob = if config.preserve_case_words {
            dist.lookup_word(&ctx.stats, word)
        } else {
            dist.lookup_word(&ctx.stats, &word.to_lowercase())
        };
        let weight = match config.naive_bayes_weighting {
            NaiveBayesWeighting::Equal | NaiveBayesWeighting::EqualWords => 1.0,
            NaiveBayesWeighting::DistanceWeighted => 1.0 / (1.0 + *distance as f64),
        };
        if prob <= 0.0 {
            log::warn!("For word {word}, prob {prob} out of range");
            continue;
        }
        total_word_weight += weight;
        total_prob += weight * prob.ln();
    }
    log::trace!("Computed total word log-likelihood as {total_prob}");
    if total_word_weight > 0.0 {
        total_prob /= total_word_weight;
    }
    total_prob * word_weight + baseline_weight * links.ln()
}
