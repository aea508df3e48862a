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

//! The ways of scoring the candidates of a toponym and of ranking the regions
//! for a document.

pub mod document;
pub mod toponym;

use rand::rngs::StdRng;
use rand::SeedableRng;
use crate::config::NaiveBayesWeighting;

pub use document::DocumentStrategy;
pub use toponym::ToponymStrategy;

/// A seeded generator if a seed is given, else one seeded by the OS.
pub(crate) fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// The `(word_weight, baseline_weight)` of a naive bayes score.
pub(crate) fn naive_bayes_weights(use_baseline: bool, weighting: NaiveBayesWeighting, baseline_weight: f64) -> (f64, f64) {
    if !use_baseline {
        (1.0, 0.0)
    } else if weighting == NaiveBayesWeighting::Equal {
        (1.0, 1.0)
    } else {
        (1.0 - baseline_weight, baseline_weight)
    }
}

#[cfg(test)]
mod test {
    use crate::config::NaiveBayesWeighting;
    use crate::strategy::naive_bayes_weights;

    #[test]
    fn weights(){
        assert_eq!((1.0, 0.0), naive_bayes_weights(false, NaiveBayesWeighting::EqualWords, 0.3));
        assert_eq!((1.0, 1.0), naive_bayes_weights(true, NaiveBayesWeighting::Equal, 0.3));
        assert_eq!((0.75, 0.25), naive_bayes_weights(true, NaiveBayesWeighting::DistanceWeighted, 0.25));
    }
}
