//! # hs-engine
//!
//! Campaign orchestration for hypersweep: the per-trial failure boundary,
//! the sequential search loop, environment settings and architecture
//! plotting. Model training itself is an injected [`Evaluator`]; this crate
//! only decides what to try next, survives whatever the evaluator does, and
//! makes sure every outcome is persisted before moving on.

mod campaign;
mod evaluator;
mod plot;
mod runner;
mod settings;

pub use campaign::SearchLoop;
pub use evaluator::{Evaluator, TrialOutcome};
pub use plot::{demo_configuration, plot_best_model, plot_demo_model, ArchPlotter, DotPlotter};
pub use runner::TrialRunner;
pub use settings::Settings;
