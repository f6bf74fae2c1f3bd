//! TPE-style sequential model-based search.
//!
//! After a random startup phase, observed trials are split at the gamma
//! quantile into a "good" and a "bad" set and each parameter is sampled to
//! maximize the density ratio l(x)/g(x) between the two sets: a kernel
//! density estimate over continuous values, Laplace-smoothed counts over
//! categorical choices and conditional toggles.

use rand::Rng;
use tracing::debug;

use hs_types::{Configuration, ObjectiveDirection, ParameterValue, SpaceError, SweepResult};

use crate::space::{quantize, ParameterKind, SearchSpace};
use crate::strategy::SearchStrategy;

/// Adaptive strategy biasing later candidates toward regions that performed
/// well earlier.
#[derive(Debug, Clone)]
pub struct TpeSearch {
    space: SearchSpace,
    direction: ObjectiveDirection,
    /// Quantile splitting good from bad observations.
    gamma: f64,
    /// Number of purely random trials before guided sampling kicks in.
    n_startup: usize,
    /// Candidates scored per parameter when maximizing the density ratio.
    n_candidates: usize,
    /// KDE bandwidth as a fraction of the parameter range.
    bandwidth_scale: f64,
    observations: Vec<(Configuration, f64)>,
}

impl TpeSearch {
    pub fn new(space: SearchSpace) -> Self {
        Self {
            space,
            direction: ObjectiveDirection::default(),
            gamma: 0.25,
            n_startup: 10,
            n_candidates: 24,
            bandwidth_scale: 0.1,
            observations: Vec::new(),
        }
    }

    pub fn with_direction(mut self, direction: ObjectiveDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma.clamp(0.01, 0.99);
        self
    }

    pub fn with_startup(mut self, n: usize) -> Self {
        self.n_startup = n.max(1);
        self
    }

    pub fn n_observations(&self) -> usize {
        self.observations.len()
    }

    fn guided_sample<R: Rng>(&self, rng: &mut R) -> Configuration {
        let mut sorted: Vec<&(Configuration, f64)> = self.observations.iter().collect();
        if sorted.len() < 2 {
            return self.space.sample_random(rng);
        }
        sorted.sort_by(|a, b| {
            let ord = a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal);
            match self.direction {
                ObjectiveDirection::Minimize => ord,
                ObjectiveDirection::Maximize => ord.reverse(),
            }
        });

        let n_good = ((sorted.len() as f64) * self.gamma).ceil() as usize;
        let n_good = n_good.max(1).min(sorted.len() - 1);
        let (good, bad) = sorted.split_at(n_good);
        let good: Vec<&Configuration> = good.iter().map(|(c, _)| c).collect();
        let bad: Vec<&Configuration> = bad.iter().map(|(c, _)| c).collect();

        let mut config = Configuration::new();
        for def in self.space.describe() {
            let good_vals: Vec<&ParameterValue> =
                good.iter().filter_map(|c| c.get(&def.name)).collect();
            let bad_vals: Vec<&ParameterValue> =
                bad.iter().filter_map(|c| c.get(&def.name)).collect();
            let value = self.sample_kind(&def.kind, &good_vals, &bad_vals, rng);
            config.insert(def.name.clone(), value);
        }
        config
    }

    fn sample_kind<R: Rng>(
        &self,
        kind: &ParameterKind,
        good: &[&ParameterValue],
        bad: &[&ParameterValue],
        rng: &mut R,
    ) -> ParameterValue {
        match kind {
            ParameterKind::Uniform { low, high } => {
                let v = self.sample_continuous(&floats(good), &floats(bad), *low, *high, rng);
                ParameterValue::Float(v)
            }
            ParameterKind::LogUniform { low, high } => {
                // Model the exponent; observed values live in exp-space.
                let g: Vec<f64> = floats(good).into_iter().map(f64::ln).collect();
                let b: Vec<f64> = floats(bad).into_iter().map(f64::ln).collect();
                let exponent = self.sample_continuous(&g, &b, *low, *high, rng);
                ParameterValue::Float(exponent.exp().clamp(low.exp(), high.exp()))
            }
            ParameterKind::QUniform { low, high, step } => {
                let v = self.sample_continuous(&floats(good), &floats(bad), *low, *high, rng);
                ParameterValue::Float(quantize(v, *low, *high, *step))
            }
            ParameterKind::Choice { options } => {
                let good_counts = count_choices(options, good);
                let bad_counts = count_choices(options, bad);
                let weights: Vec<f64> = good_counts
                    .iter()
                    .zip(bad_counts.iter())
                    .map(|(l, g)| (l + 1) as f64 / (g + 1) as f64)
                    .collect();
                let idx = pick_weighted(&weights, rng);
                ParameterValue::Json(options[idx].clone())
            }
            ParameterKind::Optional { inner } => {
                let l_on = good.iter().filter(|v| v.is_enabled()).count();
                let g_on = bad.iter().filter(|v| v.is_enabled()).count();
                let l_off = good.len() - l_on;
                let g_off = bad.len() - g_on;
                let weights = [
                    (l_off + 1) as f64 / (g_off + 1) as f64,
                    (l_on + 1) as f64 / (g_on + 1) as f64,
                ];
                if pick_weighted(&weights, rng) == 0 {
                    ParameterValue::Toggle(None)
                } else {
                    let good_inner: Vec<&ParameterValue> =
                        good.iter().filter_map(|v| v.as_toggle()).collect();
                    let bad_inner: Vec<&ParameterValue> =
                        bad.iter().filter_map(|v| v.as_toggle()).collect();
                    let nested = self.sample_kind(inner, &good_inner, &bad_inner, rng);
                    ParameterValue::Toggle(Some(Box::new(nested)))
                }
            }
        }
    }

    /// Score `n_candidates` perturbations of good observations and keep the
    /// one with the best l(x)/g(x) ratio.
    fn sample_continuous<R: Rng>(
        &self,
        good: &[f64],
        bad: &[f64],
        low: f64,
        high: f64,
        rng: &mut R,
    ) -> f64 {
        if good.is_empty() {
            return rng.random_range(low..=high);
        }

        let bandwidth = self.bandwidth_scale * (high - low);
        let mut best_value = low;
        let mut best_ratio = f64::NEG_INFINITY;

        for _ in 0..self.n_candidates {
            let base = good[rng.random_range(0..good.len())];
            let candidate = (base + gaussian(rng) * bandwidth).clamp(low, high);

            let l = kde(candidate, good, bandwidth);
            let g = kde(candidate, bad, bandwidth);
            let ratio = l / (g + 1e-12);
            if ratio > best_ratio {
                best_ratio = ratio;
                best_value = candidate;
            }
        }

        best_value
    }
}

impl SearchStrategy for TpeSearch {
    fn suggest(&mut self) -> SweepResult<Configuration> {
        if self.space.is_empty() {
            return Err(SpaceError::EmptySpace.into());
        }
        let mut rng = rand::rng();
        if self.observations.len() < self.n_startup {
            debug!(
                observed = self.observations.len(),
                startup = self.n_startup,
                "tpe startup phase: sampling at random"
            );
            Ok(self.space.sample_random(&mut rng))
        } else {
            Ok(self.guided_sample(&mut rng))
        }
    }

    fn observe(&mut self, config: &Configuration, loss: f64) {
        self.observations.push((config.clone(), loss));
    }

    fn name(&self) -> &str {
        "tpe"
    }
}

fn floats(values: &[&ParameterValue]) -> Vec<f64> {
    values.iter().filter_map(|v| v.as_float()).collect()
}

fn count_choices(options: &[serde_json::Value], values: &[&ParameterValue]) -> Vec<usize> {
    let mut counts = vec![0usize; options.len()];
    for value in values {
        if let ParameterValue::Json(v) = value {
            if let Some(idx) = options.iter().position(|o| o == v) {
                counts[idx] += 1;
            }
        }
    }
    counts
}

fn pick_weighted<R: Rng>(weights: &[f64], rng: &mut R) -> usize {
    let total: f64 = weights.iter().sum();
    let r = rng.random::<f64>() * total;
    let mut cumulative = 0.0;
    for (i, w) in weights.iter().enumerate() {
        cumulative += w;
        if r < cumulative {
            return i;
        }
    }
    weights.len() - 1
}

/// Standard normal draw via Box-Muller.
fn gaussian<R: Rng>(rng: &mut R) -> f64 {
    let u1: f64 = rng.random::<f64>().max(1e-12);
    let u2: f64 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Mean-of-Gaussians kernel density estimate.
fn kde(x: f64, values: &[f64], bandwidth: f64) -> f64 {
    if values.is_empty() {
        return 1.0;
    }
    values
        .iter()
        .map(|&v| (-(x - v).powi(2) / (2.0 * bandwidth.powi(2))).exp())
        .sum::<f64>()
        / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_space() -> SearchSpace {
        SearchSpace::new()
            .add_uniform("x", 0.0, 1.0)
            .unwrap()
            .add_choice(
                "activation",
                vec![serde_json::json!("relu"), serde_json::json!("elu")],
            )
            .unwrap()
            .add_optional(
                "residual",
                ParameterKind::QUniform {
                    low: 1.0,
                    high: 4.0,
                    step: 1.0,
                },
            )
            .unwrap()
    }

    #[test]
    fn startup_phase_samples_at_random() {
        let mut tpe = TpeSearch::new(simple_space()).with_startup(5);
        for _ in 0..5 {
            let config = tpe.suggest().unwrap();
            assert!(config.contains_key("x"));
            assert!(config.contains_key("activation"));
            assert!(config.contains_key("residual"));
        }
    }

    #[test]
    fn empty_space_is_rejected() {
        let mut tpe = TpeSearch::new(SearchSpace::new());
        assert!(tpe.suggest().is_err());
    }

    #[test]
    fn guided_samples_stay_in_distribution() {
        let space = simple_space();
        let mut tpe = TpeSearch::new(space.clone()).with_startup(3);

        for i in 0..10 {
            let config = tpe.suggest().unwrap();
            let loss = config.get("x").and_then(|v| v.as_float()).unwrap() + i as f64 * 0.01;
            tpe.observe(&config, loss);
        }
        assert_eq!(tpe.n_observations(), 10);

        for _ in 0..50 {
            let config = tpe.suggest().unwrap();
            assert!(space.contains(&config), "out-of-space sample: {config:?}");
        }
    }

    #[test]
    fn guided_sampling_prefers_good_region() {
        let space = SearchSpace::new().add_uniform("x", 0.0, 1.0).unwrap();
        let mut tpe = TpeSearch::new(space).with_startup(1).with_gamma(0.25);

        // Low x values score well, high x values score badly.
        for i in 0..40 {
            let x = if i % 4 == 0 { 0.1 } else { 0.9 };
            let mut config = Configuration::new();
            config.insert("x".into(), ParameterValue::Float(x));
            tpe.observe(&config, x);
        }

        let mean: f64 = (0..50)
            .map(|_| {
                tpe.suggest()
                    .unwrap()
                    .get("x")
                    .and_then(|v| v.as_float())
                    .unwrap()
            })
            .sum::<f64>()
            / 50.0;
        assert!(mean < 0.5, "suggestions not biased toward good region: mean {mean}");
    }

    #[test]
    fn maximize_direction_flips_good_set() {
        let space = SearchSpace::new().add_uniform("x", 0.0, 1.0).unwrap();
        let mut tpe = TpeSearch::new(space)
            .with_direction(ObjectiveDirection::Maximize)
            .with_startup(1)
            .with_gamma(0.25);

        // High x values score well under maximization.
        for i in 0..40 {
            let x = if i % 4 == 0 { 0.9 } else { 0.1 };
            let mut config = Configuration::new();
            config.insert("x".into(), ParameterValue::Float(x));
            tpe.observe(&config, x);
        }

        let mean: f64 = (0..50)
            .map(|_| {
                tpe.suggest()
                    .unwrap()
                    .get("x")
                    .and_then(|v| v.as_float())
                    .unwrap()
            })
            .sum::<f64>()
            / 50.0;
        assert!(mean > 0.5, "suggestions not biased toward good region: mean {mean}");
    }

    #[test]
    fn replayed_history_counts_as_observations() {
        let space = simple_space();
        let mut tpe = TpeSearch::new(space.clone()).with_startup(3);

        // Simulate resume: replay persisted history before any suggestion.
        let mut rng = rand::rng();
        for i in 0..5 {
            let config = space.sample_random(&mut rng);
            tpe.observe(&config, i as f64 * 0.1);
        }

        assert_eq!(tpe.n_observations(), 5);
        // Past startup already, so this exercises the guided path.
        let config = tpe.suggest().unwrap();
        assert!(space.contains(&config));
    }
}
