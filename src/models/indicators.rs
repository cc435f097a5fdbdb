use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// One completed OHLCV period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// Lookback windows and projection distance for the Ichimoku components.
///
/// Fields are private so every value in circulation has passed
/// [`IchimokuParams::validate`], including deserialised ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawIchimokuParams")]
pub struct IchimokuParams {
    tenkan_period: usize,
    kijun_period: usize,
    senkou_b_period: usize,
    displacement: usize,
}

#[derive(Deserialize)]
struct RawIchimokuParams {
    tenkan_period: usize,
    kijun_period: usize,
    senkou_b_period: usize,
    displacement: usize,
}

impl TryFrom<RawIchimokuParams> for IchimokuParams {
    type Error = ConfigurationError;

    fn try_from(raw: RawIchimokuParams) -> Result<Self, Self::Error> {
        Self::new(
            raw.tenkan_period,
            raw.kijun_period,
            raw.senkou_b_period,
            raw.displacement,
        )
    }
}

impl Default for IchimokuParams {
    fn default() -> Self {
        Self {
            tenkan_period: 9,
            kijun_period: 26,
            senkou_b_period: 52,
            displacement: 26,
        }
    }
}

impl IchimokuParams {
    pub fn new(
        tenkan_period: usize,
        kijun_period: usize,
        senkou_b_period: usize,
        displacement: usize,
    ) -> Result<Self, ConfigurationError> {
        let params = Self {
            tenkan_period,
            kijun_period,
            senkou_b_period,
            displacement,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let fields = [
            ("tenkan_period", self.tenkan_period),
            ("kijun_period", self.kijun_period),
            ("senkou_b_period", self.senkou_b_period),
            ("displacement", self.displacement),
        ];
        for (name, value) in fields {
            if value == 0 {
                return Err(ConfigurationError::InvalidParameter {
                    name: name.to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn tenkan_period(&self) -> usize {
        self.tenkan_period
    }

    pub fn kijun_period(&self) -> usize {
        self.kijun_period
    }

    pub fn senkou_b_period(&self) -> usize {
        self.senkou_b_period
    }

    pub fn displacement(&self) -> usize {
        self.displacement
    }

    pub fn longest_period(&self) -> usize {
        self.tenkan_period
            .max(self.kijun_period)
            .max(self.senkou_b_period)
    }

    /// Candles needed before the first snapshot can be produced.
    pub fn min_candles(&self) -> usize {
        self.longest_period() + self.displacement
    }

    /// Candles needed for the chikou line to be compared against a defined cloud.
    pub fn stable_chikou_candles(&self) -> usize {
        self.longest_period() + 2 * self.displacement
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudColor {
    Green,
    Red,
}

/// Ichimoku components aligned to a single bar.
///
/// `senkou_span_a` and `senkou_span_b` are the values computed `displacement`
/// bars earlier, so the cloud fields describe the cloud under this bar's price.
/// `chikou_span` is this bar's close, which plots `displacement` bars back.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    pub tenkan_sen: f64,
    pub kijun_sen: f64,
    pub senkou_span_a: f64,
    pub senkou_span_b: f64,
    pub chikou_span: f64,
    pub cloud_top: f64,
    pub cloud_bottom: f64,
    pub cloud_thickness: f64,
    pub cloud_color: CloudColor,
}

impl IndicatorSnapshot {
    pub fn new(
        index: usize,
        candle: &Candle,
        tenkan_sen: f64,
        kijun_sen: f64,
        senkou_span_a: f64,
        senkou_span_b: f64,
    ) -> Self {
        let cloud_color = if senkou_span_a >= senkou_span_b {
            CloudColor::Green
        } else {
            CloudColor::Red
        };

        Self {
            index,
            timestamp: candle.timestamp,
            close: candle.close,
            tenkan_sen,
            kijun_sen,
            senkou_span_a,
            senkou_span_b,
            chikou_span: candle.close,
            cloud_top: senkou_span_a.max(senkou_span_b),
            cloud_bottom: senkou_span_a.min(senkou_span_b),
            cloud_thickness: (senkou_span_a - senkou_span_b).abs(),
            cloud_color,
        }
    }
}
