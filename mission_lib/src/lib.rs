//! # Mission Library
//!
//! Shared types and utilities for the mission sequencer system.
//! This library is used by the sequencer node and the ground tooling.

pub mod types;
pub mod utils;

// Re-export everything for convenience
pub use types::*;
pub use utils::*;
