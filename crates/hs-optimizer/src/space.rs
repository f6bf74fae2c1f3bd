//! Declarative search space: tunable parameters and their distributions.

use rand::Rng;
use serde::{Deserialize, Serialize};

use hs_types::{Configuration, ParameterValue, SpaceError};

/// A single parameter dimension in the search space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDef {
    /// Human-readable parameter name (e.g. "lr_rate_mult").
    pub name: String,
    /// The kind of sampling distribution.
    pub kind: ParameterKind,
}

/// Describes how a parameter is sampled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterKind {
    /// Continuous uniform range [low, high].
    Uniform { low: f64, high: f64 },
    /// Log-uniform: `low` and `high` bound the *exponent*; the sampled value
    /// is `exp(u)` for `u` uniform in [low, high], so the value itself lies
    /// in [exp(low), exp(high)].
    LogUniform { low: f64, high: f64 },
    /// Uniform in [low, high], then rounded to the nearest multiple of
    /// `step` that still lies within the bounds.
    QUniform { low: f64, high: f64, step: f64 },
    /// Categorical choice among a fixed ordered list.
    Choice { options: Vec<serde_json::Value> },
    /// Conditional parameter: either disabled, or enabled with a value drawn
    /// from the nested distribution. Both arms are equally likely a priori.
    Optional { inner: Box<ParameterKind> },
}

impl ParameterKind {
    /// Validate distribution parameters. Runs at space construction so a
    /// malformed definition fails before any trial is evaluated.
    fn validate(&self, name: &str) -> Result<(), SpaceError> {
        match self {
            Self::Uniform { low, high } | Self::LogUniform { low, high } => {
                if !(low < high) || !low.is_finite() || !high.is_finite() {
                    return Err(SpaceError::InvalidBounds {
                        name: name.to_string(),
                        low: *low,
                        high: *high,
                    });
                }
                Ok(())
            }
            Self::QUniform { low, high, step } => {
                if !(low < high) || !low.is_finite() || !high.is_finite() {
                    return Err(SpaceError::InvalidBounds {
                        name: name.to_string(),
                        low: *low,
                        high: *high,
                    });
                }
                if !(*step > 0.0) || !step.is_finite() {
                    return Err(SpaceError::InvalidStep {
                        name: name.to_string(),
                        step: *step,
                    });
                }
                // The grid must intersect the bounds, or every sample would
                // have to leave it.
                let first_on_grid = (low / step).ceil() * step;
                if first_on_grid > *high {
                    return Err(SpaceError::UnreachableStep {
                        name: name.to_string(),
                        low: *low,
                        high: *high,
                        step: *step,
                    });
                }
                Ok(())
            }
            Self::Choice { options } => {
                if options.is_empty() {
                    return Err(SpaceError::EmptyChoices {
                        name: name.to_string(),
                    });
                }
                Ok(())
            }
            Self::Optional { inner } => inner.validate(name),
        }
    }

    /// Draw one value from this distribution, independently of any history.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> ParameterValue {
        match self {
            Self::Uniform { low, high } => ParameterValue::Float(rng.random_range(*low..=*high)),
            Self::LogUniform { low, high } => {
                let exponent: f64 = rng.random_range(*low..=*high);
                ParameterValue::Float(exponent.exp())
            }
            Self::QUniform { low, high, step } => {
                let u: f64 = rng.random_range(*low..=*high);
                ParameterValue::Float(quantize(u, *low, *high, *step))
            }
            Self::Choice { options } => {
                let idx = rng.random_range(0..options.len());
                ParameterValue::Json(options[idx].clone())
            }
            Self::Optional { inner } => {
                if rng.random::<f64>() < 0.5 {
                    ParameterValue::Toggle(None)
                } else {
                    ParameterValue::Toggle(Some(Box::new(inner.sample(rng))))
                }
            }
        }
    }

    /// Check that a value could have been produced by this distribution.
    pub fn contains(&self, value: &ParameterValue) -> bool {
        match (self, value) {
            (Self::Uniform { low, high }, ParameterValue::Float(v)) => *v >= *low && *v <= *high,
            (Self::LogUniform { low, high }, ParameterValue::Float(v)) => {
                *v >= low.exp() && *v <= high.exp()
            }
            (Self::QUniform { low, high, step }, ParameterValue::Float(v)) => {
                let on_grid = ((v / step).round() * step - v).abs() < 1e-9 * step.abs();
                *v >= *low && *v <= *high && on_grid
            }
            (Self::Choice { options }, ParameterValue::Json(v)) => options.contains(v),
            (Self::Optional { .. }, ParameterValue::Toggle(None)) => true,
            (Self::Optional { inner }, ParameterValue::Toggle(Some(v))) => inner.contains(v),
            _ => false,
        }
    }
}

/// Round `u` to the nearest multiple of `step`, nudged back inside
/// [low, high] if rounding pushed it over a bound.
pub(crate) fn quantize(u: f64, low: f64, high: f64, step: f64) -> f64 {
    let mut v = (u / step).round() * step;
    if v < low {
        v += step;
    }
    if v > high {
        v -= step;
    }
    v.clamp(low, high)
}

/// The full search space: an ordered list of parameter definitions.
///
/// Passive and declarative; it holds no sampling state. Definitions are
/// validated as they are added, so an invalid space cannot be constructed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchSpace {
    parameters: Vec<ParameterDef>,
}

impl SearchSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, name: impl Into<String>, kind: ParameterKind) -> Result<Self, SpaceError> {
        let name = name.into();
        kind.validate(&name)?;
        if self.parameters.iter().any(|p| p.name == name) {
            return Err(SpaceError::DuplicateParameter { name });
        }
        self.parameters.push(ParameterDef { name, kind });
        Ok(self)
    }

    pub fn add_uniform(
        self,
        name: impl Into<String>,
        low: f64,
        high: f64,
    ) -> Result<Self, SpaceError> {
        self.add(name, ParameterKind::Uniform { low, high })
    }

    pub fn add_log_uniform(
        self,
        name: impl Into<String>,
        low: f64,
        high: f64,
    ) -> Result<Self, SpaceError> {
        self.add(name, ParameterKind::LogUniform { low, high })
    }

    pub fn add_quniform(
        self,
        name: impl Into<String>,
        low: f64,
        high: f64,
        step: f64,
    ) -> Result<Self, SpaceError> {
        self.add(name, ParameterKind::QUniform { low, high, step })
    }

    pub fn add_choice(
        self,
        name: impl Into<String>,
        options: Vec<serde_json::Value>,
    ) -> Result<Self, SpaceError> {
        self.add(name, ParameterKind::Choice { options })
    }

    /// Conditional parameter: disabled, or enabled with `inner` sampled.
    pub fn add_optional(
        self,
        name: impl Into<String>,
        inner: ParameterKind,
    ) -> Result<Self, SpaceError> {
        self.add(
            name,
            ParameterKind::Optional {
                inner: Box::new(inner),
            },
        )
    }

    pub fn describe(&self) -> &[ParameterDef] {
        &self.parameters
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    /// Draw one configuration with every parameter sampled independently.
    pub fn sample_random<R: Rng>(&self, rng: &mut R) -> Configuration {
        self.parameters
            .iter()
            .map(|p| (p.name.clone(), p.kind.sample(rng)))
            .collect()
    }

    /// Check that a configuration assigns an in-distribution value to every
    /// parameter of this space.
    pub fn contains(&self, config: &Configuration) -> bool {
        self.parameters.iter().all(|p| {
            config
                .get(&p.name)
                .is_some_and(|value| p.kind.contains(value))
        })
    }
}
