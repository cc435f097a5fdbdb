//! Shared data models spanning the engine layers.

pub mod indicators;
pub mod signal;
pub mod state;
pub mod strategy;

pub use indicators::{Candle, CloudColor, IchimokuParams, IndicatorSnapshot};
pub use signal::{SignalClassification, SignalResult};
pub use state::{SignalState, StoredSignalState};
pub use strategy::{
    Condition, ConditionMap, LogicMode, Rule, RuleKind, StrategyConfig, StrategyRules,
};
