//! Explicit campaign settings, sourced from the environment.

use std::path::PathBuf;

use hs_types::{SweepError, SweepResult};

/// Recognized environment variables.
const ENV_MAX_EVALS: &str = "SWEEP_MAX_EVALS";
const ENV_EXPERIMENT: &str = "SWEEP_EXPERIMENT";
const ENV_ENVIRONMENT: &str = "SWEEP_ENVIRONMENT";
const ENV_STORE: &str = "SWEEP_STORE";
const ENV_PLOT_DIR: &str = "SWEEP_PLOT_DIR";

/// Per-invocation configuration for a campaign, passed explicitly into the
/// binary's wiring instead of being read ad hoc from globals.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Number of trials to run in this process invocation. Additive across
    /// invocations sharing one store.
    pub max_evals: usize,
    /// Experiment name; prefixes plot file names when set.
    pub experiment_name: Option<String>,
    /// Execution-environment tag. Names the subdirectory plots are written
    /// to, never affects search semantics.
    pub environment: String,
    /// Path of the persisted trial history.
    pub store_path: PathBuf,
    /// Base directory for architecture plots; see [`Self::plot_destination`].
    pub plot_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_evals: 5,
            experiment_name: None,
            environment: "local".to_string(),
            store_path: PathBuf::from("results/trials.jsonl"),
            plot_dir: PathBuf::from("results/plots"),
        }
    }
}

impl Settings {
    /// Read settings from the environment, falling back to defaults for
    /// anything unset. A present but malformed value is a configuration
    /// error, not a silent default.
    pub fn from_env() -> SweepResult<Self> {
        let mut settings = Self::default();

        if let Ok(raw) = std::env::var(ENV_MAX_EVALS) {
            settings.max_evals = raw.parse().map_err(|_| {
                SweepError::Config(format!("{ENV_MAX_EVALS} must be an integer, got '{raw}'"))
            })?;
        }
        if let Ok(name) = std::env::var(ENV_EXPERIMENT) {
            if !name.is_empty() {
                settings.experiment_name = Some(name);
            }
        }
        if let Ok(tag) = std::env::var(ENV_ENVIRONMENT) {
            if !tag.is_empty() {
                settings.environment = tag;
            }
        }
        if let Ok(path) = std::env::var(ENV_STORE) {
            if !path.is_empty() {
                settings.store_path = PathBuf::from(path);
            }
        }
        if let Ok(dir) = std::env::var(ENV_PLOT_DIR) {
            if !dir.is_empty() {
                settings.plot_dir = PathBuf::from(dir);
            }
        }

        Ok(settings)
    }

    /// Where plots go: the plot directory, partitioned per environment so
    /// runs from different environments sharing a results volume do not
    /// overwrite each other's diagrams.
    pub fn plot_destination(&self) -> PathBuf {
        self.plot_dir.join(&self.environment)
    }

    /// Plot file name for a given prefix, qualified by the experiment name
    /// when one is set.
    pub fn plot_file_prefix(&self, prefix: &str) -> String {
        match &self.experiment_name {
            Some(name) => format!("{name}_{prefix}"),
            None => prefix.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert_eq!(settings.max_evals, 5);
        assert_eq!(settings.environment, "local");
        assert!(settings.experiment_name.is_none());
    }

    #[test]
    fn plot_destination_is_partitioned_by_environment() {
        let mut settings = Settings::default();
        assert_eq!(
            settings.plot_destination(),
            PathBuf::from("results/plots/local")
        );

        settings.environment = "cluster".into();
        assert_eq!(
            settings.plot_destination(),
            PathBuf::from("results/plots/cluster")
        );
    }

    #[test]
    fn plot_prefix_uses_experiment_name() {
        let mut settings = Settings::default();
        assert_eq!(settings.plot_file_prefix("model_best"), "model_best");

        settings.experiment_name = Some("cifar100".into());
        assert_eq!(settings.plot_file_prefix("model_best"), "cifar100_model_best");
    }
}
