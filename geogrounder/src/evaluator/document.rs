use crate::article::{ArticleId, Split};
use crate::context::GeoContext;
use crate::errors::GeotagError;
use crate::eval::results::GeotagDocumentResults;
use crate::evaluator::TestFileEvaluator;
use crate::grid::RegionGrid;
use crate::strategy::DocumentStrategy;

/// The rank given to a true region missing from the ranking.
pub const RANK_NOT_FOUND: usize = 1_000_000_000;

/// The number of predicted regions logged per article.
const NUM_PREDICTED_SHOWN: usize = 5;

/// Ranks the regions for every article of the evaluation split and records
/// the rank of the region the article lies in.
#[derive(Debug)]
pub struct WikipediaDocumentEvaluator {
    strategy: DocumentStrategy,
    strategy_name: String,
    pub results: GeotagDocumentResults,
}

impl WikipediaDocumentEvaluator {
    pub fn new(strategy: DocumentStrategy, strategy_name: impl Into<String>, grid: RegionGrid) -> Self {
        Self {
            strategy,
            strategy_name: strategy_name.into(),
            results: GeotagDocumentResults::new(grid),
        }
    }
}

impl TestFileEvaluator for WikipediaDocumentEvaluator {
    type Source = Split;
    type Document = ArticleId;

    fn strategy_name(&self) -> &str {
        &self.strategy_name
    }

    fn iter_documents(&mut self, ctx: &GeoContext, source: &Split) -> Result<Vec<ArticleId>, GeotagError> {
        Ok(ctx.articles.articles_in_split(*source).to_vec())
    }

    fn describe_document(&self, ctx: &GeoContext, doc: &ArticleId) -> String {
        ctx.articles.get(*doc).to_string()
    }

    fn would_skip_document(&mut self, ctx: &GeoContext, doc: &ArticleId) -> bool {
        let art = ctx.articles.get(*doc);
        if art.dist.is_some() && art.coord.is_some() {
            return false;
        }
        // happens whenever a budget stopped the reading of the counts early
        if ctx.config.max_time().is_none() && ctx.config.num_training_docs().is_none() {
            log::warn!("Can't evaluate article {art} without distribution");
        }
        self.results.record_other_stat("Skipped articles");
        true
    }

    fn evaluate_document(&mut self, ctx: &GeoContext, doc: &ArticleId, doctag: &str) -> Result<(), GeotagError> {
        let art = ctx.articles.get(*doc);
        let (Some(dist), Some(coord)) = (art.dist.as_ref(), art.coord) else {
            self.results.record_other_stat("Skipped articles");
            return Ok(());
        };
        let grid = ctx.grid();
        let true_indices = grid.coord_to_stat_region_indices(&coord);
        let true_region = ctx.regions.region_for_coord(&coord);
        let naitr = true_region.worddist.num_arts_for_word_dist;
        log::debug!("Evaluating article {art} with {naitr} word-dist articles in true region");

        let (rank, pred, ranked) = if ctx.config.oracle_results {
            (1, true_indices, Vec::new())
        } else {
            let ranked = self.strategy.ranked_regions(ctx, dist)?;
            let Some(&(pred, _)) = ranked.first() else {
                log::warn!("No region to rank for article {art}");
                self.results.record_other_stat("Articles without ranked regions");
                return Ok(());
            };
            let rank = ranked
                .iter()
                .position(|(indices, _)| *indices == true_indices)
                .map_or(RANK_NOT_FOUND, |pos| pos + 1);
            (rank, pred, ranked)
        };

        let distances = self.results.record_result(rank, &coord, pred, naitr);
        if naitr == 0 {
            self.results.record_other_stat("Articles with no training articles in region");
        }

        if !ctx.config.oracle_results && !ctx.config.no_individual_results {
            log::info!("{doctag}:Article {art}:");
            log::info!("{doctag}:  {} types, {} tokens", dist.counts().len(), dist.total_tokens());
            log::info!("{doctag}:  True region at rank: {rank}");
            log::info!("{doctag}:  True region: {}", true_region.display(grid, &ctx.articles));
            for (i, (indices, _)) in ranked.iter().take(NUM_PREDICTED_SHOWN).enumerate() {
                log::info!(
                    "{doctag}:  Predicted region (at rank {}): {}",
                    i + 1,
                    ctx.regions.region_at(indices).display(grid, &ctx.articles)
                );
            }
            log::info!(
                "{doctag}:  Distance {:.2} miles to true region center at {}",
                distances.true_truedist,
                distances.true_center
            );
            log::info!(
                "{doctag}:  Distance {:.2} miles to predicted region center at {}",
                distances.pred_truedist,
                distances.pred_center
            );
        }
        Ok(())
    }

    fn output_results(&self, final_results: bool) {
        self.results.output_results(final_results);
    }
}
