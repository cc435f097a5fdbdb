//! Binance spot REST kline provider

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::MarketDataError;
use crate::models::indicators::Candle;
use crate::services::market_data::MarketDataProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";
const KLINES_PATH: &str = "/api/v3/klines";
/// Largest `limit` the klines endpoint accepts.
pub const MAX_KLINES_LIMIT: usize = 1000;
const MAX_RETRIES: usize = 2;

pub struct BinanceMarketDataProvider {
    client: reqwest::Client,
    base_url: String,
}

impl BinanceMarketDataProvider {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// `BTC/USDT` -> `BTCUSDT`
    pub fn exchange_symbol(symbol: &str) -> String {
        symbol.replace('/', "").to_ascii_uppercase()
    }

    async fn fetch_once(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: usize,
    ) -> Result<Vec<Value>, MarketDataError> {
        let url = format!("{}{}", self.base_url, KLINES_PATH);
        let limit = limit.min(MAX_KLINES_LIMIT).to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("symbol", symbol),
                ("interval", timeframe),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MarketDataError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| MarketDataError::Decode(e.to_string()))
    }
}

impl Default for BinanceMarketDataProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn field_f64(row: &[Value], idx: usize, name: &str) -> Result<f64, MarketDataError> {
    let value = row
        .get(idx)
        .ok_or_else(|| MarketDataError::Decode(format!("kline row missing {}", name)))?;
    match value {
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|e| MarketDataError::Decode(format!("{} '{}': {}", name, s, e))),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| MarketDataError::Decode(format!("{} is not a float", name))),
        other => Err(MarketDataError::Decode(format!(
            "unexpected {} value {}",
            name, other
        ))),
    }
}

fn field_millis(row: &[Value], idx: usize, name: &str) -> Result<DateTime<Utc>, MarketDataError> {
    row.get(idx)
        .and_then(Value::as_i64)
        .and_then(DateTime::from_timestamp_millis)
        .ok_or_else(|| MarketDataError::Decode(format!("invalid {} in kline row", name)))
}

/// Decode the array-of-arrays kline payload, keeping only candles closed by `now`.
pub fn decode_klines(rows: &[Value], now: DateTime<Utc>) -> Result<Vec<Candle>, MarketDataError> {
    let mut candles = Vec::with_capacity(rows.len());
    for row in rows {
        let row = row
            .as_array()
            .ok_or_else(|| MarketDataError::Decode("kline row is not an array".to_string()))?;

        let close_time = field_millis(row, 6, "close_time")?;
        if close_time > now {
            continue;
        }

        candles.push(Candle::new(
            field_f64(row, 1, "open")?,
            field_f64(row, 2, "high")?,
            field_f64(row, 3, "low")?,
            field_f64(row, 4, "close")?,
            field_f64(row, 5, "volume")?,
            field_millis(row, 0, "open_time")?,
        ));
    }
    Ok(candles)
}

#[async_trait]
impl MarketDataProvider for BinanceMarketDataProvider {
    async fn get_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let exchange_symbol = Self::exchange_symbol(symbol);

        let rows = (|| self.fetch_once(&exchange_symbol, timeframe, limit))
            .retry(
                ExponentialBuilder::default()
                    .with_min_delay(Duration::from_millis(500))
                    .with_max_times(MAX_RETRIES),
            )
            .sleep(tokio::time::sleep)
            .when(MarketDataError::is_transient)
            .notify(|err: &MarketDataError, delay: Duration| {
                warn!(
                    symbol = %symbol,
                    error = %err,
                    "Kline fetch for {} failed, retrying in {:?}: {}",
                    symbol,
                    delay,
                    err
                );
            })
            .await?;

        let candles = decode_klines(&rows, Utc::now())?;
        if candles.is_empty() {
            return Err(MarketDataError::Empty(symbol.to_string()));
        }

        debug!(
            symbol = %symbol,
            count = candles.len(),
            "Fetched {} completed candles for {}",
            candles.len(),
            symbol
        );
        Ok(candles)
    }
}
