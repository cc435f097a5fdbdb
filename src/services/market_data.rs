//! Market data provider interface.

use async_trait::async_trait;

use crate::error::MarketDataError;
use crate::models::indicators::Candle;

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Get completed historical candles for a symbol, oldest first.
    async fn get_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketDataError>;
}

/// Serves a fixed candle history per symbol; used for dry runs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticMarketDataProvider {
    candles: std::collections::HashMap<String, Vec<Candle>>,
}

impl StaticMarketDataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_candles(mut self, symbol: impl Into<String>, candles: Vec<Candle>) -> Self {
        self.candles.insert(symbol.into(), candles);
        self
    }
}

#[async_trait]
impl MarketDataProvider for StaticMarketDataProvider {
    async fn get_candles(
        &self,
        symbol: &str,
        _timeframe: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let candles = self
            .candles
            .get(symbol)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| MarketDataError::Empty(symbol.to_string()))?;
        let start = candles.len().saturating_sub(limit);
        Ok(candles[start..].to_vec())
    }
}
