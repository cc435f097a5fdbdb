//! Condition derivation and the end-to-end signal pipeline.

pub mod conditions;
pub mod engine;

pub use conditions::{CloudBounds, DisplacedBar};
pub use engine::SignalEngine;
