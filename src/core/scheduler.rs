//! Cron-based scheduler running one monitor cycle per tick

use chrono::{DateTime, Utc};
use cron::Schedule;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::core::monitor::Monitor;
use crate::error::ConfigurationError;

/// Runs [`Monitor::run_cycle`] on a six-field UTC cron schedule.
///
/// Cycles run one after another on a single task, so a slow cycle delays
/// the next tick instead of overlapping it.
pub struct MonitorScheduler {
    monitor: Arc<Monitor>,
    expression: String,
    schedule: Schedule,
    handle: Arc<RwLock<Option<tokio::task::JoinHandle<()>>>>,
}

impl MonitorScheduler {
    pub fn new(monitor: Arc<Monitor>, expression: &str) -> Result<Self, ConfigurationError> {
        let schedule = parse_schedule(expression)?;

        info!(
            cron = %expression,
            symbols = ?monitor.symbols(),
            "MonitorScheduler: created with cron {}",
            expression
        );

        Ok(Self {
            monitor,
            expression: expression.to_string(),
            schedule,
            handle: Arc::new(RwLock::new(None)),
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Next tick strictly after now.
    pub fn next_run(&self) -> Option<DateTime<Utc>> {
        self.schedule.upcoming(Utc).next()
    }

    /// Next tick strictly after `after`.
    pub fn next_run_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }

    pub async fn start(&self) {
        let mut guard = self.handle.write().await;
        if guard.is_some() {
            warn!("MonitorScheduler: already running");
            return;
        }

        let monitor = self.monitor.clone();
        let schedule = self.schedule.clone();

        let handle = tokio::spawn(async move {
            info!("MonitorScheduler: started, waiting for cron schedule...");

            loop {
                let Some(next_tick) = schedule.upcoming(Utc).next() else {
                    error!("MonitorScheduler: schedule has no upcoming ticks, stopping");
                    break;
                };

                let now = Utc::now();
                if next_tick > now {
                    let delay = (next_tick - now).to_std().unwrap_or_default();
                    info!(
                        next_run = %next_tick,
                        "MonitorScheduler: next cycle at {}",
                        next_tick
                    );
                    tokio::time::sleep(delay).await;
                }

                let report = monitor.run_cycle().await;
                for (symbol, e) in &report.failed {
                    warn!(symbol = %symbol, error = %e, "MonitorScheduler: {} failed this cycle: {}", symbol, e);
                }
            }
        });

        *guard = Some(handle);
        info!("MonitorScheduler: started successfully");
    }

    pub async fn stop(&self) {
        let mut handle = self.handle.write().await;
        if let Some(h) = handle.take() {
            h.abort();
            info!("MonitorScheduler: stopped");
        }
    }

    pub async fn is_running(&self) -> bool {
        let handle = self.handle.read().await;
        handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

pub fn parse_schedule(expression: &str) -> Result<Schedule, ConfigurationError> {
    Schedule::from_str(expression).map_err(|e| ConfigurationError::InvalidSchedule {
        expression: expression.to_string(),
        reason: e.to_string(),
    })
}
