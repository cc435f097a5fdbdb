//! Cached, persisted signal states with per-instrument serialisation.

use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

use crate::error::StateStoreError;
use crate::metrics::Metrics;
use crate::models::signal::{SignalClassification, SignalResult};
use crate::models::state::{SignalState, StoredSignalState};
use crate::state::store::StateStore;
use crate::state::tracker::{StateTracker, Transition};

/// Owns the state store and serialises read-modify-write per instrument.
///
/// Different instruments never contend; two evaluations of the same
/// instrument (e.g. overlapping cycles) are applied one after the other so
/// `transition_count` cannot lose updates.
pub struct SignalStateManager {
    store: Arc<dyn StateStore>,
    states: RwLock<HashMap<String, SignalState>>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    metrics: Option<Arc<Metrics>>,
}

impl SignalStateManager {
    pub fn new(store: Arc<dyn StateStore>, metrics: Option<Arc<Metrics>>) -> Self {
        Self {
            store,
            states: RwLock::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
            metrics,
        }
    }

    /// Load and validate every persisted record.
    ///
    /// A record failing validation is reinitialised to the initial state
    /// and written back, so it is reported once rather than on every start.
    /// Returns the number of instruments loaded.
    pub async fn load(&self) -> Result<usize, StateStoreError> {
        let now = Utc::now();
        let records = self.store.load_all().await?;
        let mut loaded = HashMap::with_capacity(records.len());
        let mut repaired = Vec::new();

        for (instrument, value) in records {
            let state = match StoredSignalState::decode(value, now) {
                Ok(state) => state,
                Err(e) => {
                    warn!(
                        instrument = %instrument,
                        error = %e,
                        "Corrupt state record for {}, reinitialising: {}",
                        instrument,
                        e
                    );
                    if let Some(metrics) = &self.metrics {
                        metrics.state_corruptions_total.inc();
                    }
                    repaired.push(instrument.clone());
                    SignalState::initial(now)
                }
            };
            loaded.insert(instrument, state);
        }

        for instrument in &repaired {
            if let Some(state) = loaded.get(instrument) {
                self.store.save(instrument, state).await?;
            }
        }
        if !repaired.is_empty() {
            info!(repaired = repaired.len(), "Rewrote {} reinitialised state records", repaired.len());
        }

        let count = loaded.len();
        *self.states.write().await = loaded;
        info!(instruments = count, "Loaded {} signal states", count);
        Ok(count)
    }

    async fn instrument_lock(&self, instrument: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(instrument.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Apply a fresh classification to an instrument and persist the outcome.
    ///
    /// The store is written before the cache, so on a store failure the
    /// cached state is unchanged and the caller must not notify.
    pub async fn record(
        &self,
        instrument: &str,
        result: &SignalResult,
    ) -> Result<Transition, StateStoreError> {
        let lock = self.instrument_lock(instrument).await;
        let _guard = lock.lock().await;

        let prior = self.states.read().await.get(instrument).cloned();
        let transition = StateTracker::apply(instrument, result, prior.as_ref());

        if transition.needs_persist() {
            if let Err(e) = self.store.save(instrument, &transition.state).await {
                error!(
                    instrument = %instrument,
                    error = %e,
                    "Failed to persist state for {}: {}",
                    instrument,
                    e
                );
                return Err(e);
            }
            self.states
                .write()
                .await
                .insert(instrument.to_string(), transition.state.clone());
        }

        if transition.changed {
            if let Some(metrics) = &self.metrics {
                metrics.signal_transitions_total.inc();
            }
        }

        Ok(transition)
    }

    pub async fn get(&self, instrument: &str) -> Option<SignalState> {
        self.states.read().await.get(instrument).cloned()
    }

    pub async fn all(&self) -> HashMap<String, SignalState> {
        self.states.read().await.clone()
    }

    /// Instruments whose last accepted signal is actionable.
    pub async fn active_signals(&self) -> BTreeMap<String, SignalClassification> {
        self.states
            .read()
            .await
            .iter()
            .filter(|(_, state)| state.current_signal.is_actionable())
            .map(|(instrument, state)| (instrument.clone(), state.current_signal))
            .collect()
    }

    /// Number of instruments currently holding each classification.
    pub async fn summary(&self) -> BTreeMap<SignalClassification, usize> {
        let states = self.states.read().await;
        let mut counts: BTreeMap<SignalClassification, usize> = SignalClassification::ALL
            .iter()
            .map(|signal| (*signal, 0))
            .collect();
        for state in states.values() {
            *counts.entry(state.current_signal).or_insert(0) += 1;
        }
        counts
    }

    /// Forget one instrument; it restarts from the initial state.
    pub async fn clear(&self, instrument: &str) -> Result<(), StateStoreError> {
        let lock = self.instrument_lock(instrument).await;
        let _guard = lock.lock().await;

        self.store.remove(instrument).await?;
        self.states.write().await.remove(instrument);
        info!(instrument = %instrument, "Cleared signal state for {}", instrument);
        Ok(())
    }

    /// Forget every instrument.
    ///
    /// Holds every known instrument's lock, so an in-flight [`record`](Self::record)
    /// finishes first and cannot write its state back after the clear.
    pub async fn clear_all(&self) -> Result<(), StateStoreError> {
        let mut instruments: BTreeSet<String> = self.states.read().await.keys().cloned().collect();
        instruments.extend(self.locks.lock().await.keys().cloned());

        let mut guards = Vec::with_capacity(instruments.len());
        for instrument in &instruments {
            guards.push(self.instrument_lock(instrument).await.lock_owned().await);
        }

        self.store.clear().await?;
        self.states.write().await.clear();
        info!("Cleared all signal states");
        Ok(())
    }
}
