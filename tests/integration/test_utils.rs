//! Shared fixtures for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

use kumo::models::indicators::Candle;
use kumo::services::notifier::{Notifier, SignalNotification};
use kumo::NotifyError;

pub fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, close)| {
            Candle::new(
                close - 0.5,
                close + 1.0,
                close - 1.0,
                *close,
                1_000.0,
                start + Duration::hours(4 * i as i64),
            )
        })
        .collect()
}

pub fn rising_candles(count: usize) -> Vec<Candle> {
    let closes: Vec<f64> = (0..count).map(|i| 100.0 + i as f64).collect();
    candles_from_closes(&closes)
}

pub fn falling_candles(count: usize) -> Vec<Candle> {
    let closes: Vec<f64> = (0..count).map(|i| 500.0 - i as f64).collect();
    candles_from_closes(&closes)
}

/// Binance-style kline rows: `count` closed 4h klines ending before `now`,
/// followed by one still-open kline.
pub fn kline_rows(count: usize, now: DateTime<Utc>) -> Vec<Value> {
    let period = Duration::hours(4);
    let open_start = now - Duration::hours(1);
    let first = open_start - period * count as i32;

    let mut rows: Vec<Value> = (0..count)
        .map(|i| {
            let open_time = first + period * i as i32;
            let close_time = open_time + period - Duration::milliseconds(1);
            let close = 100.0 + i as f64;
            json!([
                open_time.timestamp_millis(),
                format!("{:.2}", close - 0.5),
                format!("{:.2}", close + 1.0),
                format!("{:.2}", close - 1.0),
                format!("{:.2}", close),
                "1000.0",
                close_time.timestamp_millis(),
                "0", 10, "0", "0", "0"
            ])
        })
        .collect();

    rows.push(json!([
        open_start.timestamp_millis(),
        "1.0", "1.0", "1.0", "1.0", "1.0",
        (open_start + period - Duration::milliseconds(1)).timestamp_millis(),
        "0", 1, "0", "0", "0"
    ]));
    rows
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<SignalNotification>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, notification: &SignalNotification) -> Result<(), NotifyError> {
        self.sent.lock().await.push(notification.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct FailingNotifier {
    pub attempts: AtomicUsize,
}

#[async_trait]
impl Notifier for FailingNotifier {
    fn name(&self) -> &str {
        "failing"
    }

    async fn send(&self, _notification: &SignalNotification) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(NotifyError::Status {
            status: 503,
            body: "unavailable".to_string(),
        })
    }

    async fn send_test(&self) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(NotifyError::Status {
            status: 503,
            body: "unavailable".to_string(),
        })
    }
}
