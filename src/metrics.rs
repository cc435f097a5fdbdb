//! Prometheus metrics for the signal monitor

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};

pub struct Metrics {
    registry: Registry,
    pub monitor_cycles_total: IntCounter,
    pub signal_evaluations_total: IntCounter,
    pub signal_transitions_total: IntCounter,
    pub insufficient_data_total: IntCounter,
    pub evaluation_errors_total: IntCounter,
    pub state_corruptions_total: IntCounter,
    pub notifications_sent_total: IntCounter,
    pub notification_failures_total: IntCounter,
    pub monitor_cycle_duration_seconds: Histogram,
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter, prometheus::Error> {
    let counter = IntCounter::new(name, help)?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let monitor_cycles_total = counter(
            &registry,
            "monitor_cycles_total",
            "Monitor cycles started",
        )?;
        let signal_evaluations_total = counter(
            &registry,
            "signal_evaluations_total",
            "Instruments classified successfully",
        )?;
        let signal_transitions_total = counter(
            &registry,
            "signal_transitions_total",
            "Accepted signal state transitions",
        )?;
        let insufficient_data_total = counter(
            &registry,
            "insufficient_data_total",
            "Evaluations skipped for lack of candle history",
        )?;
        let evaluation_errors_total = counter(
            &registry,
            "evaluation_errors_total",
            "Per-instrument evaluation failures (provider or store)",
        )?;
        let state_corruptions_total = counter(
            &registry,
            "state_corruptions_total",
            "Persisted state records reinitialised after failing validation",
        )?;
        let notifications_sent_total = counter(
            &registry,
            "notifications_sent_total",
            "Notifications delivered",
        )?;
        let notification_failures_total = counter(
            &registry,
            "notification_failures_total",
            "Notification deliveries that failed",
        )?;

        let monitor_cycle_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "monitor_cycle_duration_seconds",
                "Wall time of one monitor cycle",
            )
            .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        )?;
        registry.register(Box::new(monitor_cycle_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            monitor_cycles_total,
            signal_evaluations_total,
            signal_transitions_total,
            insufficient_data_total,
            evaluation_errors_total,
            state_corruptions_total,
            notifications_sent_total,
            notification_failures_total,
            monitor_cycle_duration_seconds,
        })
    }

    /// Render every registered metric in the text exposition format.
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
