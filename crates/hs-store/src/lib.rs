//! # hs-store
//!
//! Durable record of all trials run so far, across process restarts.
//!
//! The store is a JSON Lines file, one trial record per line. Every append
//! rewrites the full history to a temp file in the same directory and
//! atomically renames it over the store path, so a crash mid-write leaves
//! the previous snapshot intact. Single process, single writer; concurrent
//! writers sharing one store path are unsupported.

mod store;

pub use store::TrialStore;
