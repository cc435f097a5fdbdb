//! Ichimoku signal engine and monitor
//!
//! Candles flow one way: indicators → conditions → classified signal →
//! per-instrument state transition → notification on change.

pub mod config;
pub mod core;
pub mod error;
pub mod indicators;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod signals;
pub mod state;
pub mod strategies;

pub use error::{
    ConfigurationError, InsufficientDataError, MarketDataError, MonitorError, NotifyError,
    StateCorruptionError, StateStoreError,
};
pub use models::{
    Candle, Condition, ConditionMap, IchimokuParams, IndicatorSnapshot, LogicMode, Rule,
    RuleKind, SignalClassification, SignalResult, SignalState, StrategyConfig, StrategyRules,
};
pub use signals::SignalEngine;
pub use state::{SignalStateManager, StateTracker, Transition};
pub use strategies::StrategyEvaluator;
