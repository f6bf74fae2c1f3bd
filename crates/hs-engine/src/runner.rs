//! Per-trial execution with failure containment.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{info, warn};

use hs_store::TrialStore;
use hs_types::{Configuration, SweepResult, TrialRecord};

use crate::evaluator::Evaluator;

/// Runs one sampled configuration through the evaluator inside a failure
/// boundary and records the outcome.
///
/// A single bad hyperparameter combination (invalid network shape, numeric
/// overflow, ...) must not abort a multi-hour campaign: evaluator errors and
/// panics are converted into `Failed` records with the diagnostic text and
/// the loop moves on. Only storage failures propagate.
pub struct TrialRunner<E: Evaluator> {
    evaluator: E,
}

impl<E: Evaluator> TrialRunner<E> {
    pub fn new(evaluator: E) -> Self {
        Self { evaluator }
    }

    /// Evaluate `config` and append the resulting record to `store` exactly
    /// once before returning.
    pub fn run(
        &mut self,
        store: &mut TrialStore,
        number: usize,
        config: Configuration,
    ) -> SweepResult<TrialRecord> {
        info!(trial = number, "starting trial");

        let outcome = catch_unwind(AssertUnwindSafe(|| self.evaluator.evaluate(&config)));

        let record = match outcome {
            Ok(Ok(result)) if result.loss.is_finite() => {
                info!(trial = number, loss = result.loss, "trial complete");
                TrialRecord::ok(number, config, result.loss, result.metrics)
            }
            Ok(Ok(result)) => {
                // Diverged training reports NaN or infinite loss; such a
                // trial can never be an incumbent, so it is a failure.
                let diagnostic = format!("evaluator returned a non-finite loss: {}", result.loss);
                warn!(trial = number, error = %diagnostic, "trial failed");
                TrialRecord::failed(number, config, diagnostic)
            }
            Ok(Err(err)) => {
                // Full chain, matching what a traceback would have shown.
                let diagnostic = format!("{err:#}");
                warn!(trial = number, error = %diagnostic, "trial failed");
                TrialRecord::failed(number, config, diagnostic)
            }
            Err(panic) => {
                let diagnostic = panic_message(panic.as_ref());
                warn!(trial = number, error = %diagnostic, "trial panicked");
                TrialRecord::failed(number, config, format!("evaluator panicked: {diagnostic}"))
            }
        };

        store.append(record.clone())?;
        Ok(record)
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
