//! Signal state transitions
//!
//! The tracker is the only gate deciding whether a notification goes out:
//! - NONE never counts as a change and never overwrites the last actionable signal
//! - repeating the current signal is not a change
//! - anything else moves `current_signal` into `previous_signal` and bumps the count

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::models::signal::{SignalClassification, SignalResult};
use crate::models::state::SignalState;

/// Result of applying one signal to an instrument's state
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub changed: bool,
    /// No prior state existed; `state` was freshly initialised.
    pub created: bool,
    pub state: SignalState,
}

impl Transition {
    /// Whether the state needs to be written back.
    pub fn needs_persist(&self) -> bool {
        self.changed || self.created
    }
}

pub struct StateTracker;

impl StateTracker {
    pub fn apply(
        instrument: &str,
        result: &SignalResult,
        prior: Option<&SignalState>,
    ) -> Transition {
        Self::apply_at(instrument, result, prior, Utc::now())
    }

    pub fn apply_at(
        instrument: &str,
        result: &SignalResult,
        prior: Option<&SignalState>,
        now: DateTime<Utc>,
    ) -> Transition {
        let created = prior.is_none();
        let prior = prior.cloned().unwrap_or_else(|| SignalState::initial(now));
        let new_signal = result.classification;

        if new_signal == SignalClassification::None {
            debug!(
                instrument = %instrument,
                current = %prior.current_signal,
                "No actionable signal for {}, keeping {}",
                instrument,
                prior.current_signal
            );
            return Transition {
                changed: false,
                created,
                state: prior,
            };
        }

        if new_signal == prior.current_signal {
            debug!(
                instrument = %instrument,
                signal = %new_signal,
                "Signal unchanged for {}: {}",
                instrument,
                new_signal
            );
            return Transition {
                changed: false,
                created,
                state: prior,
            };
        }

        let next = SignalState {
            current_signal: new_signal,
            previous_signal: prior.current_signal,
            transition_count: prior.transition_count + 1,
            confidence: result.confidence,
            updated_at: now,
        };

        info!(
            instrument = %instrument,
            from = %prior.current_signal,
            to = %new_signal,
            transition_count = next.transition_count,
            "Signal changed for {}: {} -> {}",
            instrument,
            prior.current_signal,
            new_signal
        );

        Transition {
            changed: true,
            created,
            state: next,
        }
    }
}
