//! Trial records and best-result selection rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::value::Configuration;

/// Whether we are maximizing or minimizing the objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectiveDirection {
    Maximize,
    Minimize,
}

impl Default for ObjectiveDirection {
    fn default() -> Self {
        Self::Minimize
    }
}

impl ObjectiveDirection {
    /// Strict improvement test. Exact ties do NOT improve, so the first-seen
    /// record wins when two trials report the same loss.
    pub fn improves(&self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Self::Minimize => candidate < incumbent,
            Self::Maximize => candidate > incumbent,
        }
    }
}

/// Terminal status of one trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialStatus {
    Ok,
    Failed,
}

/// One evaluation of a single sampled configuration.
///
/// Created once by the trial runner after the evaluator returns (or fails)
/// and never mutated afterwards. Failed trials carry the diagnostic text in
/// `error` and no loss; they are kept in the store for audit but excluded
/// from best-record selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub id: Uuid,
    /// Sequence number across the whole campaign, including prior
    /// process invocations.
    pub number: usize,
    pub config: Configuration,
    pub status: TrialStatus,
    pub loss: Option<f64>,
    /// Auxiliary metrics reported by the evaluator (accuracy, epochs, ...).
    pub metrics: HashMap<String, f64>,
    pub error: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl TrialRecord {
    pub fn ok(number: usize, config: Configuration, loss: f64, metrics: HashMap<String, f64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            number,
            config,
            status: TrialStatus::Ok,
            loss: Some(loss),
            metrics,
            error: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn failed(number: usize, config: Configuration, error: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            number,
            config,
            status: TrialStatus::Failed,
            loss: None,
            metrics: HashMap::new(),
            error: Some(error),
            recorded_at: Utc::now(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == TrialStatus::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ParameterValue;

    #[test]
    fn minimize_is_default_and_strict() {
        let dir = ObjectiveDirection::default();
        assert_eq!(dir, ObjectiveDirection::Minimize);
        assert!(dir.improves(0.4, 0.5));
        assert!(!dir.improves(0.5, 0.5)); // tie keeps incumbent
        assert!(!dir.improves(0.6, 0.5));
    }

    #[test]
    fn maximize_inverts_comparison() {
        let dir = ObjectiveDirection::Maximize;
        assert!(dir.improves(0.6, 0.5));
        assert!(!dir.improves(0.5, 0.5));
    }

    #[test]
    fn ok_record_carries_loss() {
        let mut config = Configuration::new();
        config.insert("lr".into(), ParameterValue::Float(0.01));
        let record = TrialRecord::ok(3, config, 0.42, HashMap::new());
        assert!(record.is_ok());
        assert_eq!(record.number, 3);
        assert_eq!(record.loss, Some(0.42));
        assert!(record.error.is_none());
    }

    #[test]
    fn failed_record_carries_diagnostic() {
        let record = TrialRecord::failed(0, Configuration::new(), "shape mismatch".into());
        assert!(!record.is_ok());
        assert!(record.loss.is_none());
        assert_eq!(record.error.as_deref(), Some("shape mismatch"));
    }

    #[test]
    fn record_round_trips_through_json() {
        let mut config = Configuration::new();
        config.insert(
            "residual".into(),
            ParameterValue::Toggle(Some(Box::new(ParameterValue::Float(2.0)))),
        );
        let record = TrialRecord::ok(7, config, 1.25, HashMap::new());

        let json = serde_json::to_string(&record).unwrap();
        let back: TrialRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }
}
