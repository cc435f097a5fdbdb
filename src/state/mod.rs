//! Per-instrument signal state: transition rules, persistence and caching.

pub mod manager;
pub mod store;
pub mod tracker;

pub use manager::SignalStateManager;
pub use store::{JsonFileStateStore, MemoryStateStore, RedisStateStore, StateStore};
pub use tracker::{StateTracker, Transition};
