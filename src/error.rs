//! Error taxonomy for the signal engine and its collaborators

use std::path::PathBuf;
use thiserror::Error;

/// Candle history is too short for the requested periods and displacement.
///
/// Non-retryable without more data. The instrument's cycle is skipped and
/// its prior state is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("insufficient candle history: {available} candles available, {required} required")]
pub struct InsufficientDataError {
    pub required: usize,
    pub available: usize,
}

/// Systemic misconfiguration detected while loading configuration.
///
/// Always fatal at start-up, never defaulted.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("rule '{rule}' references unknown condition '{name}'")]
    UnknownCondition { rule: String, name: String },

    #[error("rule '{rule}' has invalid logic mode '{mode}' (expected ALL or ANY)")]
    InvalidLogicMode { rule: String, mode: String },

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("invalid value '{value}' for environment variable {name}")]
    InvalidEnv { name: String, value: String },

    #[error("invalid schedule '{expression}': {reason}")]
    InvalidSchedule { expression: String, reason: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A persisted state record that fails its structural invariants.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateCorruptionError {
    #[error("transition_count is negative ({0})")]
    NegativeTransitionCount(i64),

    #[error("unknown signal '{0}'")]
    UnknownSignal(String),

    #[error("confidence {0} is outside [0, 1]")]
    ConfidenceOutOfRange(f64),

    #[error("malformed record: {0}")]
    Malformed(String),
}

/// Persistence I/O failure in a state store backend.
#[derive(Debug, Error)]
pub enum StateStoreError {
    #[error("state file I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("state serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Failure fetching candles from a market data provider.
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("market data request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("market data endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode market data: {0}")]
    Decode(String),

    #[error("no candles returned for {0}")]
    Empty(String),
}

impl MarketDataError {
    /// Whether a retry has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            MarketDataError::Http(_) => true,
            MarketDataError::Status { status, .. } => *status == 429 || *status >= 500,
            MarketDataError::Decode(_) | MarketDataError::Empty(_) => false,
        }
    }
}

/// Failure delivering a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("notification endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },
}

/// Per-instrument failure inside a monitor cycle.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    InsufficientData(#[from] InsufficientDataError),

    #[error(transparent)]
    MarketData(#[from] MarketDataError),

    #[error(transparent)]
    StateStore(#[from] StateStoreError),
}
