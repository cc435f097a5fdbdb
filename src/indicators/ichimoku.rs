//! Ichimoku Kinko Hyo indicator
//!
//! For every bar `i` the snapshot holds:
//! - Tenkan-sen: midpoint of high/low over `tenkan_period` bars ending at `i`
//! - Kijun-sen: midpoint of high/low over `kijun_period` bars ending at `i`
//! - Senkou Span A: (tenkan + kijun) / 2 computed at `i - displacement`
//! - Senkou Span B: midpoint over `senkou_b_period` bars ending at `i - displacement`
//! - Chikou span: `close[i]`, which plots at `i - displacement`
//!
//! The first snapshot sits at index `longest_period + displacement - 1`.

use crate::error::InsufficientDataError;
use crate::models::indicators::{Candle, IchimokuParams, IndicatorSnapshot};

/// Compute one aligned snapshot per bar where all components are defined.
pub fn compute(
    candles: &[Candle],
    params: &IchimokuParams,
) -> Result<Vec<IndicatorSnapshot>, InsufficientDataError> {
    debug_assert!(params.validate().is_ok(), "invalid Ichimoku parameters");

    let required = params.min_candles();
    if candles.len() < required {
        return Err(InsufficientDataError {
            required,
            available: candles.len(),
        });
    }

    let first = required - 1;
    let snapshots = (first..candles.len())
        .map(|i| {
            let base = i - params.displacement();
            let tenkan_sen = midpoint(candles, i, params.tenkan_period());
            let kijun_sen = midpoint(candles, i, params.kijun_period());
            let senkou_span_a = (midpoint(candles, base, params.tenkan_period())
                + midpoint(candles, base, params.kijun_period()))
                / 2.0;
            let senkou_span_b = midpoint(candles, base, params.senkou_b_period());

            IndicatorSnapshot::new(
                i,
                &candles[i],
                tenkan_sen,
                kijun_sen,
                senkou_span_a,
                senkou_span_b,
            )
        })
        .collect();

    Ok(snapshots)
}

/// Compute with the 9/26/52/26 reference parameters
pub fn compute_default(
    candles: &[Candle],
) -> Result<Vec<IndicatorSnapshot>, InsufficientDataError> {
    compute(candles, &IchimokuParams::default())
}

/// (highest high + lowest low) / 2 over `period` bars ending at `end`.
fn midpoint(candles: &[Candle], end: usize, period: usize) -> f64 {
    let window = &candles[end + 1 - period..=end];
    let (high, low) = window
        .iter()
        .fold((f64::NEG_INFINITY, f64::INFINITY), |(high, low), c| {
            (high.max(c.high), low.min(c.low))
        });
    (high + low) / 2.0
}
