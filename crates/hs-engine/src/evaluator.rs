//! The external trial evaluator boundary.

use std::collections::HashMap;

use hs_types::Configuration;

/// What a successful evaluation reports back.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialOutcome {
    /// The scalar being optimized (validation loss by convention).
    pub loss: f64,
    /// Auxiliary metrics for the record (accuracy, epochs trained, ...).
    pub metrics: HashMap<String, f64>,
}

impl TrialOutcome {
    pub fn new(loss: f64) -> Self {
        Self {
            loss,
            metrics: HashMap::new(),
        }
    }

    pub fn with_metric(mut self, name: &str, value: f64) -> Self {
        self.metrics.insert(name.to_string(), value);
        self
    }
}

/// Injected collaborator that trains/evaluates a model for one sampled
/// configuration. May block for minutes to hours; the search loop imposes no
/// timeout. Errors (and panics) are contained by the trial runner and never
/// abort the campaign.
pub trait Evaluator {
    fn evaluate(&mut self, config: &Configuration) -> anyhow::Result<TrialOutcome>;
}

impl<F> Evaluator for F
where
    F: FnMut(&Configuration) -> anyhow::Result<TrialOutcome>,
{
    fn evaluate(&mut self, config: &Configuration) -> anyhow::Result<TrialOutcome> {
        self(config)
    }
}
