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

//! Reading test documents and evaluating a strategy on them.

pub mod document;
pub mod toponym;

use std::fmt::Display;
use std::time::Duration;
use geogrounder_toolkit::status::StatusMessage;
use crate::context::GeoContext;
use crate::errors::GeotagError;

pub use document::WikipediaDocumentEvaluator;
pub use toponym::{GeogWord, GeotagToponymEvaluator};

/// Results in between are logged when this much time and [INTERIM_MIN_DOCUMENTS]
/// documents have passed since the last ones.
const INTERIM_INTERVAL: Duration = Duration::from_secs(300);
const INTERIM_MIN_DOCUMENTS: usize = 10;

/// Evaluates a strategy on the documents of some sources.
pub trait TestFileEvaluator {
    /// Where the documents come from.
    type Source: Display;
    type Document;

    /// The name of the evaluated strategy.
    fn strategy_name(&self) -> &str;

    fn iter_documents(&mut self, ctx: &GeoContext, source: &Self::Source) -> Result<Vec<Self::Document>, GeotagError>;

    /// A name of the document for the log.
    fn describe_document(&self, ctx: &GeoContext, doc: &Self::Document) -> String;

    /// True if the document can not be evaluated. A skipped document does not
    /// count as processed.
    fn would_skip_document(&mut self, _ctx: &GeoContext, _doc: &Self::Document) -> bool {
        false
    }

    fn evaluate_document(&mut self, ctx: &GeoContext, doc: &Self::Document, doctag: &str) -> Result<(), GeotagError>;

    /// Logs the results so far, `final_results` is set once all documents are done.
    fn output_results(&self, final_results: bool);
}

fn output_final_results<E: TestFileEvaluator + ?Sized>(evaluator: &E, status: &StatusMessage) {
    log::info!("");
    log::info!(
        "Final results for strategy {}: All {} documents processed:",
        evaluator.strategy_name(),
        status.num_processed()
    );
    evaluator.output_results(true);
    log::info!("Ending final results for strategy {}", evaluator.strategy_name());
}

/// Evaluates every document of the sources, honoring the skipping and the
/// document limit of the config, and logs the results.
pub fn evaluate_and_output_results<E, I>(evaluator: &mut E, ctx: &GeoContext, sources: I) -> Result<(), GeotagError>
where
    E: TestFileEvaluator + ?Sized,
    I: IntoIterator<Item = E::Source>,
{
    let config = &ctx.config;
    let mut status = StatusMessage::new("document");
    let mut last_elapsed = Duration::ZERO;
    let mut last_processed = 0usize;
    let mut skip_initial = config.skip_initial_test_docs;
    let mut skip_n = 0usize;

    for source in sources {
        log::info!("Processing evaluation file {source}...");
        for doc in evaluator.iter_documents(ctx, &source)? {
            let doctag = format!("#{}", status.num_processed() + 1);
            if evaluator.would_skip_document(ctx, &doc) {
                log::info!("Skipped document {}", evaluator.describe_document(ctx, &doc));
                continue;
            }

            let passed_over = if skip_initial > 0 {
                skip_initial -= 1;
                true
            } else if skip_n > 0 {
                skip_n -= 1;
                true
            } else {
                skip_n = config.every_nth_test_doc.saturating_sub(1);
                false
            };
            if passed_over {
                log::info!("Passed over document {doctag}");
            } else {
                evaluator.evaluate_document(ctx, &doc, &doctag)?;
            }
            status.item_processed();

            let new_elapsed = status.elapsed_time();
            let new_processed = status.num_processed();
            if let Some(max) = config.num_test_docs() {
                if new_processed >= max {
                    log::info!("");
                    log::info!("Finishing evaluation after {new_processed} documents");
                    output_final_results(evaluator, &status);
                    return Ok(());
                }
            }

            if new_elapsed - last_elapsed >= INTERIM_INTERVAL && new_processed - last_processed >= INTERIM_MIN_DOCUMENTS {
                log::info!("Results after {new_processed} documents (strategy {}):", evaluator.strategy_name());
                evaluator.output_results(false);
                log::info!("End of results after {new_processed} documents (strategy {}):", evaluator.strategy_name());
                last_elapsed = new_elapsed;
                last_processed = new_processed;
            }
        }
    }

    output_final_results(evaluator, &status);
    Ok(())
}

#[cfg(test)]
mod test {
    use crate::config::GeotagConfig;
    use crate::context::test::context;
    use crate::context::GeoContext;
    use crate::errors::GeotagError;
    use crate::evaluator::{evaluate_and_output_results, TestFileEvaluator};

    /// Evaluates numbers, odd ones can not be evaluated.
    #[derive(Default)]
    struct Numbers {
        evaluated: Vec<String>,
    }

    impl TestFileEvaluator for Numbers {
        type Source = usize;
        type Document = usize;

        fn strategy_name(&self) -> &str {
            "numbers"
        }

        fn iter_documents(&mut self, _ctx: &GeoContext, source: &usize) -> Result<Vec<usize>, GeotagError> {
            Ok((0..*source).collect())
        }

        fn describe_document(&self, _ctx: &GeoContext, doc: &usize) -> String {
            doc.to_string()
        }

        fn would_skip_document(&mut self, _ctx: &GeoContext, doc: &usize) -> bool {
            doc % 2 == 1
        }

        fn evaluate_document(&mut self, _ctx: &GeoContext, doc: &usize, doctag: &str) -> Result<(), GeotagError> {
            self.evaluated.push(format!("{doctag}={doc}"));
            Ok(())
        }

        fn output_results(&self, final_results: bool) {
            assert!(final_results);
        }
    }

    #[test]
    fn documents_are_skipped_and_limited(){
        let _ = env_logger::builder().is_test(true).try_init();
        let ctx = context(GeotagConfig { skip_initial_test_docs: 1, every_nth_test_doc: 2, ..Default::default() });
        let mut numbers = Numbers::default();
        evaluate_and_output_results(&mut numbers, &ctx, [12]).unwrap();
        // 0, 2, 4, 6, 8, 10 count, the first and every second after it are passed over
        assert_eq!(vec!["#2=2", "#4=6", "#6=10"], numbers.evaluated);

        let ctx = context(GeotagConfig { num_test_docs: 2, ..Default::default() });
        let mut numbers = Numbers::default();
        evaluate_and_output_results(&mut numbers, &ctx, [6, 6]).unwrap();
        assert_eq!(vec!["#1=0", "#2=2"], numbers.evaluated);
    }

    #[test]
    fn unvalidated_every_nth_evaluates_everything(){
        let ctx = context(GeotagConfig { every_nth_test_doc: 0, ..Default::default() });
        let mut numbers = Numbers::default();
        evaluate_and_output_results(&mut numbers, &ctx, [5]).unwrap();
        assert_eq!(vec!["#1=0", "#2=2", "#3=4"], numbers.evaluated);
    }
}
