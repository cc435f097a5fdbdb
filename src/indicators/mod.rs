//! Indicator calculators

pub mod ichimoku;

pub use ichimoku::{compute, compute_default};
