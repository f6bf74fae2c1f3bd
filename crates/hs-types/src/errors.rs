use thiserror::Error;

/// Main error type for the hypersweep system.
///
/// Note that a failing evaluator is deliberately NOT represented here: a
/// per-trial evaluation failure is contained by the trial runner and becomes
/// a `Failed` trial record instead of an error.
#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Search space error: {0}")]
    Space(#[from] SpaceError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Search-space definition errors. All of these are raised eagerly at
/// construction time, before any trial runs.
#[derive(Error, Debug)]
pub enum SpaceError {
    #[error("invalid bounds for parameter '{name}': low {low} must be below high {high}")]
    InvalidBounds { name: String, low: f64, high: f64 },

    #[error("invalid step for parameter '{name}': {step} (must be positive and finite)")]
    InvalidStep { name: String, step: f64 },

    #[error(
        "parameter '{name}' has no multiple of step {step} within [{low}, {high}]"
    )]
    UnreachableStep {
        name: String,
        low: f64,
        high: f64,
        step: f64,
    },

    #[error("parameter '{name}' has an empty choice list")]
    EmptyChoices { name: String },

    #[error("parameter '{name}' is defined twice")]
    DuplicateParameter { name: String },

    #[error("search space has no parameters")]
    EmptySpace,
}

/// Persisted trial-history errors. An absent store is not an error (first
/// run starts empty); a corrupt existing store is fatal so no history is
/// silently discarded.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("trial store {path} is corrupt at line {line}: {message}")]
    Corrupt {
        path: String,
        line: usize,
        message: String,
    },

    #[error("failed to read trial store {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to write trial store {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

/// Result type alias for hypersweep operations.
pub type SweepResult<T> = Result<T, SweepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_error_display() {
        let err = SpaceError::InvalidBounds {
            name: "lr".into(),
            low: 1.0,
            high: 0.5,
        };
        let msg = err.to_string();
        assert!(msg.contains("lr"));
        assert!(msg.contains("1"));
        assert!(msg.contains("0.5"));
    }

    #[test]
    fn space_error_converts_to_sweep_error() {
        let err: SweepError = SpaceError::EmptySpace.into();
        match err {
            SweepError::Space(_) => (),
            other => panic!("expected Space error, got {other:?}"),
        }
    }

    #[test]
    fn storage_error_converts_to_sweep_error() {
        let err: SweepError = StorageError::Corrupt {
            path: "results.jsonl".into(),
            line: 3,
            message: "bad json".into(),
        }
        .into();
        assert!(err.to_string().contains("results.jsonl"));
    }
}
