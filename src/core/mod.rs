//! Orchestration: monitor cycles and their schedule

pub mod monitor;
pub mod scheduler;

pub use monitor::{CycleReport, Monitor, SymbolOutcome};
pub use scheduler::MonitorScheduler;
