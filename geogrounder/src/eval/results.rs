use std::collections::BTreeMap;
use ordered_float::OrderedFloat;
use geogrounder_toolkit::table_by_range::TableByRange;
use crate::article::compute_short_form;
use crate::coord::{degree_dist, spheredist, Coord, MILES_PER_DEGREE};
use crate::eval::{EvalOutput, EvalWithCandidateList, GeotagDocumentEval, IncorrectReason};
use crate::grid::{RegionGrid, RegionIndices};

const TOPONYM_REASONS: &[IncorrectReason] = &[
    IncorrectReason::IncorrectWithNoCandidates,
    IncorrectReason::IncorrectWithNoCorrectCandidates,
    IncorrectReason::IncorrectWithMultipleCorrectCandidates,
    IncorrectReason::IncorrectOneCorrectCandidateMissingLinkInfo,
    IncorrectReason::IncorrectOneCorrectCandidate,
];

/// Toponym results overall, for toponyms that differ from the name of the true
/// location, and for toponyms that also differ from its short form.
#[derive(Debug, Clone)]
pub struct GeotagToponymResults {
    pub all_toponym: EvalWithCandidateList,
    pub diff_surface: EvalWithCandidateList,
    pub diff_short: EvalWithCandidateList,
}

impl Default for GeotagToponymResults {
    fn default() -> Self {
        Self {
            all_toponym: EvalWithCandidateList::new(TOPONYM_REASONS),
            diff_surface: EvalWithCandidateList::new(TOPONYM_REASONS),
            diff_short: EvalWithCandidateList::new(TOPONYM_REASONS),
        }
    }
}

impl GeotagToponymResults {
    pub fn record_result(&mut self, correct: bool, toponym: &str, trueloc: &str, reason: Option<IncorrectReason>, num_candidates: usize) {
        self.all_toponym.record_result(correct, reason, num_candidates);
        if toponym != trueloc {
            self.diff_surface.record_result(correct, reason, num_candidates);
            let (short, _) = compute_short_form(trueloc);
            if toponym != short {
                self.diff_short.record_result(correct, reason, num_candidates);
            }
        }
    }

    pub fn record_other_stat(&mut self, other: &str) {
        self.all_toponym.eval.record_other_stat(other);
    }

    pub fn output_results(&self) {
        log::info!("Results for all toponyms:");
        self.all_toponym.output_results();
        log::info!("");
        log::info!("Results for toponyms when different from true location name:");
        self.diff_surface.output_results();
        log::info!("");
        log::info!("Results for toponyms when different from either true location name");
        log::info!("  or its short form:");
        self.diff_short.output_results();
    }
}

const DIST_FRACTION_INCREMENT: f64 = 0.25;

const NUM_ARTICLES_IN_TRUE_REGION_RANGES: [f64; 4] = [1.0, 10.0, 25.0, 100.0];

const DIST_FRACTIONS_FOR_ERROR_DIST: [f64; 26] = [
    0.25, 0.5, 0.75, 1.0, 1.5, 2.0, 3.0, 4.0, 6.0, 8.0,
    12.0, 16.0, 24.0, 32.0, 48.0, 64.0, 96.0, 128.0, 192.0, 256.0,
    384.0, 512.0, 768.0, 1024.0, 1536.0, 2048.0,
];

/// The distances that go with one recorded document, as returned by
/// [GeotagDocumentResults::record_result].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DocumentDistances {
    pub pred_center: Coord,
    pub pred_truedist: f64,
    pub pred_degdist: f64,
    pub true_center: Coord,
    pub true_truedist: f64,
    pub true_degdist: f64,
}

/// Document results overall and broken down by the number of training articles
/// in the true region and by distance.
///
/// Distances used as keys are measured in tiling regions: miles divided by the
/// miles per region, degrees divided by the degrees per region.
#[derive(Debug, Clone)]
pub struct GeotagDocumentResults {
    grid: RegionGrid,
    pub all_document: GeotagDocumentEval,
    docs_by_naitr: TableByRange<GeotagDocumentEval>,
    docs_by_degree_dist_to_true_center: BTreeMap<OrderedFloat<f64>, GeotagDocumentEval>,
    docs_by_true_dist_to_true_center: BTreeMap<OrderedFloat<f64>, GeotagDocumentEval>,
    docs_by_degree_dist_to_pred_center: TableByRange<GeotagDocumentEval>,
    docs_by_true_dist_to_pred_center: TableByRange<GeotagDocumentEval>,
}

impl GeotagDocumentResults {
    pub fn new(grid: RegionGrid) -> Self {
        Self {
            grid,
            all_document: GeotagDocumentEval::default(),
            docs_by_naitr: TableByRange::new(NUM_ARTICLES_IN_TRUE_REGION_RANGES.to_vec()),
            docs_by_degree_dist_to_true_center: BTreeMap::new(),
            docs_by_true_dist_to_true_center: BTreeMap::new(),
            docs_by_degree_dist_to_pred_center: TableByRange::new(DIST_FRACTIONS_FOR_ERROR_DIST.to_vec()),
            docs_by_true_dist_to_pred_center: TableByRange::new(DIST_FRACTIONS_FOR_ERROR_DIST.to_vec()),
        }
    }

    fn miles_per_region(&self) -> f64 {
        self.grid.degrees_per_region() * MILES_PER_DEGREE
    }

    /// Records the rank of the true region for a document at `coord` whose best
    /// predicted region is `pred`.
    pub fn record_result(&mut self, rank: usize, coord: &Coord, pred: RegionIndices, num_arts_in_true_region: usize) -> DocumentDistances {
        let pred_center = self.grid.stat_region_indices_to_center_coord(pred.0, pred.1);
        let pred_truedist = spheredist(coord, &pred_center);
        let pred_degdist = degree_dist(coord, &pred_center);

        self.all_document.record_result(rank, pred_truedist, pred_degdist);
        self.docs_by_naitr
            .get_collector(num_arts_in_true_region as f64)
            .record_result(rank, pred_truedist, pred_degdist);

        let (true_latind, true_longind) = self.grid.coord_to_stat_region_indices(coord);
        let true_center = self.grid.stat_region_indices_to_center_coord(true_latind, true_longind);
        let true_truedist = spheredist(coord, &true_center);
        let true_degdist = degree_dist(coord, &true_center);
        self.all_document.record_oracle_result(true_truedist, true_degdist);

        let miles_per_region = self.miles_per_region();
        let degrees_per_region = self.grid.degrees_per_region();
        let round = |v: f64| OrderedFloat(DIST_FRACTION_INCREMENT * (v / DIST_FRACTION_INCREMENT).floor());
        self.docs_by_true_dist_to_true_center
            .entry(round(true_truedist / miles_per_region))
            .or_default()
            .record_result(rank, pred_truedist, pred_degdist);
        self.docs_by_degree_dist_to_true_center
            .entry(round(true_degdist / degrees_per_region))
            .or_default()
            .record_result(rank, pred_truedist, pred_degdist);

        self.docs_by_true_dist_to_pred_center
            .get_collector(pred_truedist / miles_per_region)
            .record_result(rank, pred_truedist, pred_degdist);
        self.docs_by_degree_dist_to_pred_center
            .get_collector(pred_degdist / degrees_per_region)
            .record_result(rank, pred_truedist, pred_degdist);

        DocumentDistances { pred_center, pred_truedist, pred_degdist, true_center, true_truedist, true_degdist }
    }

    pub fn record_other_stat(&mut self, other: &str) {
        self.all_document.record_other_stat(other);
    }

    /// Logs the overall results, and with `all_results` the breakdowns.
    pub fn output_results(&self, all_results: bool) {
        log::info!("");
        log::info!("Results for all documents/articles:");
        self.all_document.output_results();
        if !all_results {
            return;
        }
        for (lower, upper, eval) in self.docs_by_naitr.iter_ranges(false, false) {
            log::info!("");
            log::info!("Results for documents/articles where number of articles");
            log::info!("  in true region is in the range [{lower},{upper}):");
            eval.output_results();
        }
        let miles_per_region = self.miles_per_region();
        for (fraction, eval) in self.docs_by_true_dist_to_true_center.iter() {
            log::info!("");
            log::info!("Results for documents/articles where distance to center");
            log::info!(
                "  of true region in miles is in the range [{:.2},{:.2}):",
                fraction.0 * miles_per_region,
                (fraction.0 + DIST_FRACTION_INCREMENT) * miles_per_region
            );
            eval.output_results();
        }
        let degrees_per_region = self.grid.degrees_per_region();
        for (fraction, eval) in self.docs_by_degree_dist_to_true_center.iter() {
            log::info!("");
            log::info!("Results for documents/articles where distance to center");
            log::info!(
                "  of true region in degrees is in the range [{:.2},{:.2}):",
                fraction.0 * degrees_per_region,
                (fraction.0 + DIST_FRACTION_INCREMENT) * degrees_per_region
            );
            eval.output_results();
        }
        for (label, table) in [("miles", &self.docs_by_true_dist_to_pred_center), ("degrees", &self.docs_by_degree_dist_to_pred_center)] {
            for (lower, upper, eval) in table.iter_ranges(false, false) {
                log::info!("");
                log::info!("Results for documents/articles where distance to center");
                log::info!("  of predicted region in regions ({label}) is in the range [{lower},{upper}):");
                eval.output_results();
            }
        }
    }
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;
    use crate::coord::Coord;
    use crate::eval::results::{GeotagDocumentResults, GeotagToponymResults};
    use crate::eval::IncorrectReason;
    use crate::grid::RegionGrid;

    #[test]
    fn toponym_results_by_surface_form(){
        let mut results = GeotagToponymResults::default();
        results.record_result(true, "Tucson", "Tucson", None, 1);
        results.record_result(true, "Tucson", "Tucson, Arizona", None, 2);
        results.record_result(false, "Springfield", "Springfield, Illinois", Some(IncorrectReason::IncorrectWithMultipleCorrectCandidates), 9);
        results.record_result(false, "Big Apple", "New York City", Some(IncorrectReason::IncorrectWithNoCandidates), 0);
        assert_eq!(4, results.all_toponym.eval.total_instances);
        assert_eq!(3, results.diff_surface.eval.total_instances);
        assert_eq!(1, results.diff_short.eval.total_instances);
        assert_eq!(1, results.diff_short.eval.incorrect_for(IncorrectReason::IncorrectWithNoCandidates));
        results.output_results();
    }

    #[test]
    fn document_results_measure_distances(){
        let _ = env_logger::builder().is_test(true).try_init();
        let grid = RegionGrid::new(1.0, 1).unwrap();
        let mut results = GeotagDocumentResults::new(grid);
        let coord = Coord::new(48.5, 2.5);
        let true_region = grid.coord_to_stat_region_indices(&coord);
        let dists = results.record_result(1, &coord, true_region, 4);
        assert_relative_eq!(dists.pred_truedist, dists.true_truedist);
        assert_relative_eq!(0.0, dists.pred_degdist, epsilon = 1e-9);

        let far = results.record_result(3, &coord, (true_region.0 + 2, true_region.1), 4);
        assert_relative_eq!(2.0, far.pred_degdist, epsilon = 1e-9);
        assert_eq!(2, results.all_document.rank.eval.total_instances);
        assert_eq!(1, results.all_document.rank.eval.correct_instances);
        results.record_other_stat("Skipped articles");
        results.output_results(true);
    }
}
