//! One evaluation cycle over every monitored instrument
//!
//! Each instrument runs as its own future: fetch candles, classify, record
//! the state transition, and notify on change. A failure for one instrument
//! is reported in the [`CycleReport`] and never affects the others.

use futures_util::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::error::MonitorError;
use crate::metrics::Metrics;
use crate::models::signal::SignalResult;
use crate::models::strategy::StrategyConfig;
use crate::services::market_data::MarketDataProvider;
use crate::services::notifier::{Notifier, SignalNotification};
use crate::signals::engine::SignalEngine;
use crate::state::manager::SignalStateManager;
use crate::state::tracker::Transition;

#[derive(Debug, Clone)]
pub struct SymbolOutcome {
    pub symbol: String,
    pub result: SignalResult,
    pub transition: Transition,
    /// Notifiers that accepted the notification.
    pub notified: usize,
}

#[derive(Debug, Default)]
pub struct CycleReport {
    pub evaluated: Vec<SymbolOutcome>,
    pub failed: Vec<(String, MonitorError)>,
    pub duration: Duration,
}

impl CycleReport {
    pub fn transitions(&self) -> impl Iterator<Item = &SymbolOutcome> {
        self.evaluated.iter().filter(|o| o.transition.changed)
    }
}

pub struct Monitor {
    symbols: Vec<String>,
    timeframe: String,
    data_points: usize,
    strategy: StrategyConfig,
    provider: Arc<dyn MarketDataProvider>,
    states: Arc<SignalStateManager>,
    notifiers: Vec<Arc<dyn Notifier>>,
    metrics: Option<Arc<Metrics>>,
}

impl Monitor {
    pub fn new(
        symbols: Vec<String>,
        strategy: StrategyConfig,
        provider: Arc<dyn MarketDataProvider>,
        states: Arc<SignalStateManager>,
    ) -> Self {
        Self {
            symbols,
            timeframe: crate::config::DEFAULT_TIMEFRAME.to_string(),
            data_points: crate::config::DEFAULT_DATA_POINTS,
            strategy,
            provider,
            states,
            notifiers: Vec::new(),
            metrics: None,
        }
    }

    pub fn with_timeframe(mut self, timeframe: impl Into<String>) -> Self {
        self.timeframe = timeframe.into();
        self
    }

    pub fn with_data_points(mut self, data_points: usize) -> Self {
        self.data_points = data_points;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn states(&self) -> &Arc<SignalStateManager> {
        &self.states
    }

    pub async fn run_cycle(&self) -> CycleReport {
        let started = Instant::now();
        if let Some(metrics) = &self.metrics {
            metrics.monitor_cycles_total.inc();
        }

        info!(
            symbols = self.symbols.len(),
            strategy = %self.strategy.name,
            "Starting monitor cycle for {} symbols",
            self.symbols.len()
        );

        let outcomes = join_all(self.symbols.iter().map(|symbol| async move {
            (symbol.clone(), self.evaluate_symbol(symbol).await)
        }))
        .await;

        let mut report = CycleReport::default();
        for (symbol, outcome) in outcomes {
            match outcome {
                Ok(outcome) => report.evaluated.push(outcome),
                Err(e) => report.failed.push((symbol, e)),
            }
        }
        report.duration = started.elapsed();

        if let Some(metrics) = &self.metrics {
            metrics
                .monitor_cycle_duration_seconds
                .observe(report.duration.as_secs_f64());
        }

        info!(
            evaluated = report.evaluated.len(),
            failed = report.failed.len(),
            transitions = report.transitions().count(),
            duration_ms = report.duration.as_millis() as u64,
            "Monitor cycle finished: {} evaluated, {} failed",
            report.evaluated.len(),
            report.failed.len()
        );
        report
    }

    /// Evaluate a single instrument end to end.
    pub async fn evaluate_symbol(&self, symbol: &str) -> Result<SymbolOutcome, MonitorError> {
        let candles = self
            .provider
            .get_candles(symbol, &self.timeframe, self.data_points)
            .await
            .map_err(|e| {
                error!(symbol = %symbol, error = %e, "Failed to fetch candles for {}: {}", symbol, e);
                self.count_error();
                e
            })?;

        let (result, conditions) = SignalEngine::evaluate_with_conditions(&candles, &self.strategy)
            .map_err(|e| {
                warn!(
                    symbol = %symbol,
                    required = e.required,
                    available = e.available,
                    "Skipping {}: {}",
                    symbol,
                    e
                );
                if let Some(metrics) = &self.metrics {
                    metrics.insufficient_data_total.inc();
                }
                e
            })?;

        if let Some(metrics) = &self.metrics {
            metrics.signal_evaluations_total.inc();
        }
        debug!(
            symbol = %symbol,
            conditions = ?conditions.true_conditions(),
            "Conditions for {}",
            symbol
        );
        info!(
            symbol = %symbol,
            signal = %result.classification,
            confidence = result.confidence,
            price = result.price(),
            "Classified {}: {} ({:.0}%)",
            symbol,
            result.classification,
            result.confidence * 100.0
        );

        let transition = self.states.record(symbol, &result).await.map_err(|e| {
            self.count_error();
            e
        })?;

        let notified = if transition.changed {
            self.dispatch(symbol, &result, &transition).await
        } else {
            0
        };

        Ok(SymbolOutcome {
            symbol: symbol.to_string(),
            result,
            transition,
            notified,
        })
    }

    /// Send each notifier's connectivity check. Failures are logged and counted, never fatal.
    pub async fn send_test_notifications(&self) -> usize {
        info!(notifiers = self.notifiers.len(), "Sending test notifications");
        let checks = self.notifiers.iter().map(|notifier| async move {
            (notifier.name().to_string(), notifier.send_test().await)
        });

        let mut delivered = 0;
        for (name, outcome) in join_all(checks).await {
            match outcome {
                Ok(()) => {
                    delivered += 1;
                    info!(notifier = %name, "{} test notification sent", name);
                }
                Err(e) => {
                    if let Some(metrics) = &self.metrics {
                        metrics.notification_failures_total.inc();
                    }
                    error!(notifier = %name, error = %e, "{} test notification failed: {}", name, e);
                }
            }
        }
        delivered
    }

    fn count_error(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.evaluation_errors_total.inc();
        }
    }

    /// Send to every notifier; failures are logged and never roll back state.
    async fn dispatch(&self, symbol: &str, result: &SignalResult, transition: &Transition) -> usize {
        let notification = SignalNotification::new(symbol, result, transition);
        let sends = self.notifiers.iter().map(|notifier| {
            let notification = &notification;
            async move { (notifier.name().to_string(), notifier.send(notification).await) }
        });

        let mut delivered = 0;
        for (name, outcome) in join_all(sends).await {
            match outcome {
                Ok(()) => {
                    delivered += 1;
                    if let Some(metrics) = &self.metrics {
                        metrics.notifications_sent_total.inc();
                    }
                    debug!(symbol = %symbol, notifier = %name, "Sent {} notification for {}", name, symbol);
                }
                Err(e) => {
                    if let Some(metrics) = &self.metrics {
                        metrics.notification_failures_total.inc();
                    }
                    error!(
                        symbol = %symbol,
                        notifier = %name,
                        error = %e,
                        "Failed to send {} notification for {}: {}",
                        name,
                        symbol,
                        e
                    );
                }
            }
        }
        delivered
    }
}
