use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SplitError {
    #[error("At least one split fraction is required.")]
    NoSplits,
    #[error("Split fractions have to be positive, got {0}.")]
    NonPositiveFraction(f64),
}

/// Deterministically distributes items over splits in the given proportions.
///
/// The fractions are normalised so that the smallest one is 1. The generator cycles
/// over the splits, yielding a split as long as its cumulative count is below its
/// fraction. After a full cycle without output every cumulative count is reduced
/// by its fraction, so fractional remainders carry over to the next round.
///
/// With maximum split sizes a split that reached its size is never produced again,
/// a size of 0 means no maximum. The iterator ends once every split is exhausted.
#[derive(Debug, Clone)]
pub struct SplitSetGenerator {
    fractions: Vec<f64>,
    cumulative: Vec<f64>,
    produced: Vec<usize>,
    max_split_sizes: Vec<Option<usize>>,
    position: usize,
    this_output: bool,
}

impl SplitSetGenerator {
    pub fn new(split_fractions: &[f64]) -> Result<Self, SplitError> {
        if split_fractions.is_empty() {
            return Err(SplitError::NoSplits);
        }
        if let Some(bad) = split_fractions.iter().find(|v| !(**v > 0.0)) {
            return Err(SplitError::NonPositiveFraction(*bad));
        }
        let min = split_fractions.iter().copied().fold(f64::INFINITY, f64::min);
        let fractions: Vec<f64> = split_fractions.iter().map(|v| *v / min).collect();
        let len = fractions.len();
        Ok(Self {
            fractions,
            cumulative: vec![0.0; len],
            produced: vec![0; len],
            max_split_sizes: vec![None; len],
            position: 0,
            this_output: false,
        })
    }

    /// Sets the maximum size per split, missing or 0 entries mean no maximum.
    pub fn with_max_split_sizes(mut self, max_split_sizes: &[usize]) -> Self {
        for (idx, max) in self.max_split_sizes.iter_mut().enumerate() {
            *max = max_split_sizes.get(idx).copied().filter(|v| *v > 0);
        }
        self
    }

    fn is_exhausted(&self, split: usize) -> bool {
        self.max_split_sizes[split].is_some_and(|max| self.produced[split] >= max)
    }

    pub fn produced(&self) -> &[usize] {
        &self.produced
    }
}

impl Iterator for SplitSetGenerator {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        let num_splits = self.fractions.len();
        if (0..num_splits).all(|j| self.is_exhausted(j)) {
            return None;
        }
        loop {
            while self.position < num_splits {
                let j = self.position;
                self.position += 1;
                if self.cumulative[j] < self.fractions[j] {
                    self.cumulative[j] += 1.0;
                    self.this_output = true;
                    if self.is_exhausted(j) {
                        continue;
                    }
                    self.produced[j] += 1;
                    return Some(j);
                }
            }
            if !self.this_output {
                for (cum, frac) in self.cumulative.iter_mut().zip(self.fractions.iter()) {
                    while *cum >= *frac {
                        *cum -= *frac;
                    }
                }
            }
            self.position = 0;
            self.this_output = false;
        }
    }
}

/// Shortcut for [SplitSetGenerator::new].
pub fn next_split_set(split_fractions: &[f64]) -> Result<SplitSetGenerator, SplitError> {
    SplitSetGenerator::new(split_fractions)
}

#[cfg(test)]
mod test {
    use itertools::Itertools;
    use crate::splits::{next_split_set, SplitError};

    #[test]
    fn eighty_ten_ten(){
        let produced = next_split_set(&[80.0, 10.0, 10.0]).unwrap().take(20).collect_vec();
        assert_eq!(
            vec![0, 1, 2, 0, 0, 0, 0, 0, 0, 0, 0, 1, 2, 0, 0, 0, 0, 0, 0, 0],
            produced
        );
    }

    #[test]
    fn fractional_parts_carry(){
        let produced = next_split_set(&[1.5, 1.0]).unwrap().take(10).collect_vec();
        let zeros = produced.iter().filter(|v| **v == 0).count();
        assert_eq!(6, zeros);
        assert_eq!(vec![0, 1, 0], produced[..3].to_vec());
    }

    #[test]
    fn max_split_size_exhausts(){
        let gen = next_split_set(&[2.0, 1.0]).unwrap().with_max_split_sizes(&[3, 2]);
        let produced = gen.collect_vec();
        assert_eq!(3, produced.iter().filter(|v| **v == 0).count());
        assert_eq!(2, produced.iter().filter(|v| **v == 1).count());

        let unlimited_first = next_split_set(&[2.0, 1.0]).unwrap().with_max_split_sizes(&[0, 1]);
        let produced = unlimited_first.take(10).collect_vec();
        assert_eq!(1, produced.iter().filter(|v| **v == 1).count());
        assert_eq!(9, produced.iter().filter(|v| **v == 0).count());
    }

    #[test]
    fn rejects_bad_input(){
        assert_eq!(SplitError::NoSplits, next_split_set(&[]).unwrap_err());
        assert_eq!(SplitError::NonPositiveFraction(0.0), next_split_set(&[1.0, 0.0]).unwrap_err());
    }
}
