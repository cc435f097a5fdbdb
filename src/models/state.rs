//! Per-instrument signal state and its persisted record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StateCorruptionError;
use crate::models::signal::SignalClassification;

/// Last accepted signal of one instrument, carried across cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalState {
    pub current_signal: SignalClassification,
    pub previous_signal: SignalClassification,
    pub transition_count: u64,
    pub confidence: f64,
    pub updated_at: DateTime<Utc>,
}

impl SignalState {
    pub fn initial(now: DateTime<Utc>) -> Self {
        Self {
            current_signal: SignalClassification::None,
            previous_signal: SignalClassification::None,
            transition_count: 0,
            confidence: 0.0,
            updated_at: now,
        }
    }
}

/// Persisted form of [`SignalState`].
///
/// Every field is optional on read so older and newer writers stay compatible:
/// unknown fields are ignored and missing ones take the initial-state value.
/// `transition_count` is signed so a negative count surfaces as corruption
/// instead of a parse failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredSignalState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_signal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_signal: Option<String>,
    pub transition_count: i64,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl StoredSignalState {
    /// Decode a raw JSON record and check its invariants.
    pub fn decode(
        value: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<SignalState, StateCorruptionError> {
        let record: StoredSignalState = serde_json::from_value(value)
            .map_err(|e| StateCorruptionError::Malformed(e.to_string()))?;
        record.into_state(now)
    }

    pub fn into_state(self, now: DateTime<Utc>) -> Result<SignalState, StateCorruptionError> {
        if self.transition_count < 0 {
            return Err(StateCorruptionError::NegativeTransitionCount(
                self.transition_count,
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(StateCorruptionError::ConfidenceOutOfRange(self.confidence));
        }

        Ok(SignalState {
            current_signal: parse_signal(self.current_signal)?,
            previous_signal: parse_signal(self.previous_signal)?,
            transition_count: self.transition_count as u64,
            confidence: self.confidence,
            updated_at: self.updated_at.unwrap_or(now),
        })
    }
}

fn parse_signal(raw: Option<String>) -> Result<SignalClassification, StateCorruptionError> {
    match raw {
        Some(name) => name
            .parse()
            .map_err(StateCorruptionError::UnknownSignal),
        None => Ok(SignalClassification::None),
    }
}

impl From<&SignalState> for StoredSignalState {
    fn from(state: &SignalState) -> Self {
        Self {
            current_signal: Some(state.current_signal.as_str().to_string()),
            previous_signal: Some(state.previous_signal.as_str().to_string()),
            transition_count: i64::try_from(state.transition_count).unwrap_or(i64::MAX),
            confidence: state.confidence,
            updated_at: Some(state.updated_at),
        }
    }
}
