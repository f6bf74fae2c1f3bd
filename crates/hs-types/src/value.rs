//! Sampled parameter values and trial configurations.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A concrete parameter value produced by a search strategy.
///
/// `Toggle` carries conditional parameters: `Toggle(None)` means the feature
/// is disabled for this trial, `Toggle(Some(v))` means it is enabled with the
/// nested value `v` drawn from the conditional distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterValue {
    Float(f64),
    Int(i64),
    Json(serde_json::Value),
    Toggle(Option<Box<ParameterValue>>),
}

impl ParameterValue {
    /// Get as float (converts int to float if needed).
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            Self::Json(v) => v.as_f64(),
            Self::Toggle(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(v) => Some(*v as i64),
            Self::Json(v) => v.as_i64(),
            Self::Toggle(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Json(v) => v.as_str(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Json(v) => v.as_bool(),
            _ => None,
        }
    }

    /// For `Toggle` values: the nested value if enabled, `None` if disabled.
    /// Returns `None` for non-toggle values as well.
    pub fn as_toggle(&self) -> Option<&ParameterValue> {
        match self {
            Self::Toggle(Some(inner)) => Some(inner),
            _ => None,
        }
    }

    /// Whether this is a toggle in the enabled state.
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Toggle(Some(_)))
    }
}

impl std::fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Json(v) => write!(f, "{v}"),
            Self::Toggle(None) => write!(f, "off"),
            Self::Toggle(Some(inner)) => write!(f, "on({inner})"),
        }
    }
}

/// A concrete assignment of values to all tunable parameters for one trial.
///
/// Produced by sampling the search space; immutable once created and consumed
/// exactly once by the evaluator.
pub type Configuration = HashMap<String, ParameterValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_accessors() {
        let v = ParameterValue::Float(0.5);
        assert_eq!(v.as_float(), Some(0.5));
        assert_eq!(v.as_int(), Some(0));
        assert_eq!(v.as_str(), None);
    }

    #[test]
    fn json_accessors() {
        let v = ParameterValue::Json(serde_json::json!("relu"));
        assert_eq!(v.as_str(), Some("relu"));
        assert_eq!(v.as_float(), None);

        let b = ParameterValue::Json(serde_json::json!(true));
        assert_eq!(b.as_bool(), Some(true));
    }

    #[test]
    fn toggle_accessors() {
        let off = ParameterValue::Toggle(None);
        assert!(off.as_toggle().is_none());
        assert!(!off.is_enabled());

        let on = ParameterValue::Toggle(Some(Box::new(ParameterValue::Int(3))));
        assert!(on.is_enabled());
        assert_eq!(on.as_toggle().and_then(|v| v.as_int()), Some(3));
    }

    #[test]
    fn toggle_round_trips_through_json() {
        let on = ParameterValue::Toggle(Some(Box::new(ParameterValue::Float(2.5))));
        let json = serde_json::to_string(&on).unwrap();
        let back: ParameterValue = serde_json::from_str(&json).unwrap();
        assert_eq!(on, back);

        let off = ParameterValue::Toggle(None);
        let json = serde_json::to_string(&off).unwrap();
        let back: ParameterValue = serde_json::from_str(&json).unwrap();
        assert_eq!(off, back);
    }

    #[test]
    fn int_value_keeps_type_through_json() {
        let v = ParameterValue::Int(42);
        let json = serde_json::to_string(&v).unwrap();
        let back: ParameterValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ParameterValue::Int(42));
    }

    #[test]
    fn display_formats() {
        assert_eq!(ParameterValue::Float(1.5).to_string(), "1.5");
        assert_eq!(ParameterValue::Toggle(None).to_string(), "off");
        assert_eq!(
            ParameterValue::Toggle(Some(Box::new(ParameterValue::Int(4)))).to_string(),
            "on(4)"
        );
    }
}
