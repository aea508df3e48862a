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

pub mod results;

use std::collections::BTreeMap;
use strum::{AsRefStr, Display, EnumIter};
use geogrounder_toolkit::stats::{mean, median_of_sorted};
use crate::coord::miles_and_km;

/// Why a toponym was resolved to a wrong location.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, AsRefStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum IncorrectReason {
    IncorrectWithNoCandidates,
    IncorrectWithNoCorrectCandidates,
    IncorrectWithMultipleCorrectCandidates,
    IncorrectOneCorrectCandidateMissingLinkInfo,
    IncorrectOneCorrectCandidate,
}

impl IncorrectReason {
    pub fn description(&self) -> &'static str {
        match self {
            IncorrectReason::IncorrectWithNoCandidates => "Incorrect, with no candidates",
            IncorrectReason::IncorrectWithNoCorrectCandidates => "Incorrect, with candidates but no correct candidates",
            IncorrectReason::IncorrectWithMultipleCorrectCandidates => "Incorrect, with multiple correct candidates",
            IncorrectReason::IncorrectOneCorrectCandidateMissingLinkInfo => "Incorrect, with one correct candidate, but link info missing",
            IncorrectReason::IncorrectOneCorrectCandidate => "Incorrect, with one correct candidate",
        }
    }
}

/// Logs `header = amount/total = xx.xx%`.
pub fn output_fraction(header: &str, amount: impl Into<f64> + Copy + std::fmt::Display, total: impl Into<f64> + Copy + std::fmt::Display) {
    let (a, t) = (amount.into(), total.into());
    if a > t {
        log::warn!("Something wrong: Fractional quantity {amount} greater than total {total}");
    }
    if t == 0.0 {
        log::info!("{header} = {amount}/{total} = indeterminate percent");
    } else {
        log::info!("{header} = {amount}/{total} = {:5.2}%", 100.0 * a / t);
    }
}

/// The counters shared by every kind of evaluation.
#[derive(Debug, Clone, Default)]
pub struct Eval {
    pub total_instances: u32,
    pub correct_instances: u32,
    pub incorrect_instances: u32,
    reasons: &'static [IncorrectReason],
    incorrect_reasons: BTreeMap<IncorrectReason, u32>,
    other_stats: BTreeMap<String, u32>,
}

impl Eval {
    /// `reasons` are the incorrect reasons listed in the output.
    pub fn new(reasons: &'static [IncorrectReason]) -> Self {
        Self { reasons, ..Default::default() }
    }

    pub fn record_result(&mut self, correct: bool, reason: Option<IncorrectReason>) {
        self.total_instances += 1;
        if correct {
            self.correct_instances += 1;
        } else {
            self.incorrect_instances += 1;
            if let Some(reason) = reason {
                *self.incorrect_reasons.entry(reason).or_default() += 1;
            }
        }
    }

    pub fn record_other_stat(&mut self, other: &str) {
        *self.other_stats.entry(other.to_string()).or_default() += 1;
    }

    pub fn incorrect_for(&self, reason: IncorrectReason) -> u32 {
        self.incorrect_reasons.get(&reason).copied().unwrap_or(0)
    }

    pub fn other_stat(&self, other: &str) -> u32 {
        self.other_stats.get(other).copied().unwrap_or(0)
    }

    fn output_correct(&self) {
        output_fraction("Percent correct", self.correct_instances, self.total_instances);
    }

    fn output_incorrect(&self) {
        output_fraction("Percent incorrect", self.incorrect_instances, self.total_instances);
        for reason in self.reasons {
            output_fraction(&format!("  {}", reason.description()), self.incorrect_for(*reason), self.total_instances);
        }
    }

    fn output_other_stats(&self) {
        for (name, count) in self.other_stats.iter() {
            log::info!("{name} = {count}");
        }
    }
}

/// Writes the results of an evaluation to the log.
pub trait EvalOutput {
    fn eval(&self) -> &Eval;

    fn output_correct_results(&self) {
        self.eval().output_correct();
    }

    fn output_incorrect_results(&self) {
        self.eval().output_incorrect();
    }

    fn output_results(&self) {
        let eval = self.eval();
        if eval.total_instances == 0 {
            log::warn!("Strange, no instances found at all; perhaps --eval-format is incorrect?");
            return;
        }
        log::info!("Number of instances = {}", eval.total_instances);
        self.output_correct_results();
        self.output_incorrect_results();
        eval.output_other_stats();
    }
}

impl EvalOutput for Eval {
    fn eval(&self) -> &Eval {
        self
    }
}

/// Additionally splits the results by the number of candidates.
#[derive(Debug, Clone)]
pub struct EvalWithCandidateList {
    pub eval: Eval,
    max_individual_candidates: usize,
    total_by_num_candidates: BTreeMap<usize, u32>,
    correct_by_num_candidates: BTreeMap<usize, u32>,
    incorrect_by_num_candidates: BTreeMap<usize, u32>,
}

impl EvalWithCandidateList {
    pub const DEFAULT_MAX_INDIVIDUAL_CANDIDATES: usize = 5;

    pub fn new(reasons: &'static [IncorrectReason]) -> Self {
        Self::with_max_individual_candidates(reasons, Self::DEFAULT_MAX_INDIVIDUAL_CANDIDATES)
    }

    pub fn with_max_individual_candidates(reasons: &'static [IncorrectReason], max_individual_candidates: usize) -> Self {
        Self {
            eval: Eval::new(reasons),
            max_individual_candidates,
            total_by_num_candidates: BTreeMap::new(),
            correct_by_num_candidates: BTreeMap::new(),
            incorrect_by_num_candidates: BTreeMap::new(),
        }
    }

    pub fn record_result(&mut self, correct: bool, reason: Option<IncorrectReason>, num_candidates: usize) {
        self.eval.record_result(correct, reason);
        *self.total_by_num_candidates.entry(num_candidates).or_default() += 1;
        let table = if correct { &mut self.correct_by_num_candidates } else { &mut self.incorrect_by_num_candidates };
        *table.entry(num_candidates).or_default() += 1;
    }

    pub fn total_with_candidates(&self, num_candidates: usize) -> u32 {
        self.total_by_num_candidates.get(&num_candidates).copied().unwrap_or(0)
    }

    fn output_table_by_num_candidates(&self, table: &BTreeMap<usize, u32>, total: u32) {
        for i in 0..=self.max_individual_candidates {
            output_fraction(&format!("  With {i}  candidates"), table.get(&i).copied().unwrap_or(0), total);
        }
        let above: u32 = table.range(self.max_individual_candidates + 1..).map(|(_, v)| *v).sum();
        output_fraction(&format!("  With {}+ candidates", self.max_individual_candidates + 1), above, total);
    }
}

impl EvalOutput for EvalWithCandidateList {
    fn eval(&self) -> &Eval {
        &self.eval
    }

    fn output_correct_results(&self) {
        self.eval.output_correct();
        self.output_table_by_num_candidates(&self.correct_by_num_candidates, self.eval.correct_instances);
    }

    fn output_incorrect_results(&self) {
        self.eval.output_incorrect();
        self.output_table_by_num_candidates(&self.incorrect_by_num_candidates, self.eval.incorrect_instances);
    }
}

/// An evaluation where every instance yields the rank of the correct answer.
///
/// A rank up to `max_rank_for_credit` earns `max_rank_for_credit + 1 - rank` credit.
#[derive(Debug, Clone)]
pub struct EvalWithRank {
    pub eval: Eval,
    max_rank_for_credit: usize,
    incorrect_by_exact_rank: BTreeMap<usize, u32>,
    correct_by_up_to_rank: BTreeMap<usize, u32>,
    pub incorrect_past_max_rank: u32,
    pub total_credit: usize,
}

impl EvalWithRank {
    pub const DEFAULT_MAX_RANK_FOR_CREDIT: usize = 10;

    pub fn new(max_rank_for_credit: usize) -> Self {
        Self {
            eval: Eval::new(&[]),
            max_rank_for_credit,
            incorrect_by_exact_rank: BTreeMap::new(),
            correct_by_up_to_rank: BTreeMap::new(),
            incorrect_past_max_rank: 0,
            total_credit: 0,
        }
    }

    /// `rank` starts at 1, values below are treated as 1.
    pub fn record_result(&mut self, rank: usize) {
        let rank = rank.max(1);
        self.eval.record_result(rank == 1, None);
        if rank <= self.max_rank_for_credit {
            self.total_credit += self.max_rank_for_credit + 1 - rank;
            *self.incorrect_by_exact_rank.entry(rank).or_default() += 1;
            for i in rank..=self.max_rank_for_credit {
                *self.correct_by_up_to_rank.entry(i).or_default() += 1;
            }
        } else {
            self.incorrect_past_max_rank += 1;
        }
    }

    pub fn correct_up_to_rank(&self, rank: usize) -> u32 {
        self.correct_by_up_to_rank.get(&rank).copied().unwrap_or(0)
    }

    pub fn incorrect_at_rank(&self, rank: usize) -> u32 {
        self.incorrect_by_exact_rank.get(&rank).copied().unwrap_or(0)
    }
}

impl Default for EvalWithRank {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_RANK_FOR_CREDIT)
    }
}

impl EvalOutput for EvalWithRank {
    fn eval(&self) -> &Eval {
        &self.eval
    }

    fn output_correct_results(&self) {
        self.eval.output_correct();
        let possible_credit = self.max_rank_for_credit * self.eval.total_instances as usize;
        output_fraction("Percent correct with partial credit", self.total_credit as f64, possible_credit as f64);
        for i in 2..=self.max_rank_for_credit {
            output_fraction(&format!("  Correct is at or above rank {i}"), self.correct_up_to_rank(i), self.eval.total_instances);
        }
    }

    fn output_incorrect_results(&self) {
        self.eval.output_incorrect();
        for i in 2..=self.max_rank_for_credit {
            output_fraction(&format!("  Incorrect, with correct at rank {i}"), self.incorrect_at_rank(i), self.eval.total_instances);
        }
        output_fraction(
            &format!("  Incorrect, with correct not in top {}", self.max_rank_for_credit),
            self.incorrect_past_max_rank,
            self.eval.total_instances
        );
    }
}

/// Ranks plus the error distances of the predicted and of the best possible region.
#[derive(Debug, Clone, Default)]
pub struct GeotagDocumentEval {
    pub rank: EvalWithRank,
    true_dists: Vec<f64>,
    degree_dists: Vec<f64>,
    oracle_true_dists: Vec<f64>,
    oracle_degree_dists: Vec<f64>,
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut values = values.to_vec();
    values.sort_by(f64::total_cmp);
    values
}

fn describe_miles(value: Option<f64>) -> String {
    value.map_or_else(|| "undefined".to_string(), miles_and_km)
}

fn describe_degrees(value: Option<f64>) -> String {
    value.map_or_else(|| "undefined".to_string(), |v| format!("{v:.2} degrees"))
}

impl GeotagDocumentEval {
    pub fn record_result(&mut self, rank: usize, pred_true_dist: f64, pred_degree_dist: f64) {
        self.rank.record_result(rank);
        self.true_dists.push(pred_true_dist);
        self.degree_dists.push(pred_degree_dist);
    }

    pub fn record_oracle_result(&mut self, oracle_true_dist: f64, oracle_degree_dist: f64) {
        self.oracle_true_dists.push(oracle_true_dist);
        self.oracle_degree_dists.push(oracle_degree_dist);
    }

    pub fn record_other_stat(&mut self, other: &str) {
        self.rank.eval.record_other_stat(other);
    }

    pub fn mean_true_error(&self) -> Option<f64> {
        mean(&self.true_dists)
    }

    pub fn median_true_error(&self) -> Option<f64> {
        median_of_sorted(&sorted(&self.true_dists))
    }
}

impl EvalOutput for GeotagDocumentEval {
    fn eval(&self) -> &Eval {
        &self.rank.eval
    }

    fn output_correct_results(&self) {
        self.rank.output_correct_results();
    }

    fn output_incorrect_results(&self) {
        self.rank.output_incorrect_results();
        let degree_dists = sorted(&self.degree_dists);
        let oracle_true_dists = sorted(&self.oracle_true_dists);
        log::info!("  Mean true error distance = {}", describe_miles(self.mean_true_error()));
        log::info!("  Median true error distance = {}", describe_miles(self.median_true_error()));
        log::info!("  Mean degree error distance = {}", describe_degrees(mean(&degree_dists)));
        log::info!("  Median degree error distance = {}", describe_degrees(median_of_sorted(&degree_dists)));
        log::info!("  Mean oracle true error distance = {}", describe_miles(mean(&oracle_true_dists)));
        log::info!("  Median oracle true error distance = {}", describe_miles(median_of_sorted(&oracle_true_dists)));
        if !self.oracle_degree_dists.is_empty() {
            let oracle_degree_dists = sorted(&self.oracle_degree_dists);
            log::debug!("  Median oracle degree error distance = {}", describe_degrees(median_of_sorted(&oracle_degree_dists)));
        }
    }
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;
    use crate::eval::{Eval, EvalOutput, EvalWithCandidateList, EvalWithRank, GeotagDocumentEval, IncorrectReason};

    #[test]
    fn counts_results_and_reasons(){
        let mut eval = Eval::new(&[IncorrectReason::IncorrectWithNoCandidates]);
        eval.record_result(true, None);
        eval.record_result(false, Some(IncorrectReason::IncorrectWithNoCandidates));
        eval.record_result(false, None);
        eval.record_other_stat("Skipped document");
        assert_eq!(3, eval.total_instances);
        assert_eq!(1, eval.correct_instances);
        assert_eq!(2, eval.incorrect_instances);
        assert_eq!(1, eval.incorrect_for(IncorrectReason::IncorrectWithNoCandidates));
        assert_eq!(0, eval.incorrect_for(IncorrectReason::IncorrectOneCorrectCandidate));
        assert_eq!(1, eval.other_stat("Skipped document"));
        eval.output_results();
    }

    #[test]
    fn candidate_lists_are_bucketed(){
        let mut eval = EvalWithCandidateList::new(&[]);
        eval.record_result(true, None, 1);
        eval.record_result(false, None, 7);
        eval.record_result(false, None, 9);
        assert_eq!(1, eval.total_with_candidates(1));
        assert_eq!(1, eval.total_with_candidates(7));
        assert_eq!(0, eval.total_with_candidates(3));
        eval.output_results();
    }

    #[test]
    fn rank_credit(){
        let mut eval = EvalWithRank::default();
        eval.record_result(1);
        eval.record_result(3);
        eval.record_result(11);
        assert_eq!(1, eval.eval.correct_instances);
        assert_eq!(2, eval.eval.incorrect_instances);
        assert_eq!(10 + 8, eval.total_credit);
        assert_eq!(1, eval.incorrect_past_max_rank);
        assert_eq!(1, eval.correct_up_to_rank(2));
        assert_eq!(2, eval.correct_up_to_rank(3));
        assert_eq!(2, eval.correct_up_to_rank(10));
        assert_eq!(1, eval.incorrect_at_rank(3));
    }

    #[test]
    fn document_error_distances(){
        let mut eval = GeotagDocumentEval::default();
        eval.record_result(1, 10.0, 0.1);
        eval.record_result(2, 30.0, 0.3);
        eval.record_result(5, 20.0, 0.2);
        eval.record_oracle_result(5.0, 0.05);
        assert_relative_eq!(20.0, eval.mean_true_error().unwrap());
        assert_relative_eq!(20.0, eval.median_true_error().unwrap());
        assert_eq!(3, eval.rank.eval.total_instances);
        eval.output_results();

        let empty = GeotagDocumentEval::default();
        assert_eq!(None, empty.mean_true_error());
    }
}
