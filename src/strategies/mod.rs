//! Strategy rule evaluation that turns conditions into classified signals.

pub mod evaluator;

pub use evaluator::{RuleOutcome, StrategyEvaluator};
