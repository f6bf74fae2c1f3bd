//! # hs-optimizer
//!
//! Search space definitions and sampling strategies for hypersweep.
//!
//! Provides the declarative parameter space (uniform, log-uniform, quantized,
//! categorical and conditional distributions), independent random search, and
//! a TPE-style sequential model-based strategy that biases later candidates
//! toward regions that performed well earlier.

mod space;
mod strategy;
mod tpe;

pub use space::{ParameterDef, ParameterKind, SearchSpace};
pub use strategy::{RandomSearch, SearchStrategy};
pub use tpe::TpeSearch;
