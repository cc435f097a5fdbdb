//! Boolean Ichimoku conditions for the latest completed bar
//!
//! Each above/below pair is computed independently. Equality, or an undefined
//! reference value, leaves both members of a pair false.

use crate::models::indicators::{Candle, IchimokuParams, IndicatorSnapshot};
use crate::models::strategy::{Condition, ConditionMap};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloudBounds {
    pub top: f64,
    pub bottom: f64,
}

impl From<&IndicatorSnapshot> for CloudBounds {
    fn from(snapshot: &IndicatorSnapshot) -> Self {
        Self {
            top: snapshot.cloud_top,
            bottom: snapshot.cloud_bottom,
        }
    }
}

/// Price and cloud at the bar the chikou line is displaced to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplacedBar {
    pub index: usize,
    pub close: f64,
    /// `None` when the history is too short for a cloud at that bar.
    pub cloud: Option<CloudBounds>,
}

impl DisplacedBar {
    /// Locate the bar `displacement` bars behind `latest`.
    ///
    /// `snapshots` must be the contiguous output of the calculator for `candles`.
    pub fn locate(
        candles: &[Candle],
        snapshots: &[IndicatorSnapshot],
        latest: &IndicatorSnapshot,
        params: &IchimokuParams,
    ) -> Option<Self> {
        let index = latest.index.checked_sub(params.displacement())?;
        let close = candles.get(index)?.close;
        let cloud = snapshots.first().and_then(|first| {
            index
                .checked_sub(first.index)
                .and_then(|offset| snapshots.get(offset))
                .map(CloudBounds::from)
        });

        Some(Self {
            index,
            close,
            cloud,
        })
    }
}

/// Evaluate all ten conditions for `latest`.
pub fn evaluate(latest: &IndicatorSnapshot, displaced: &DisplacedBar) -> ConditionMap {
    let close = latest.close;
    let chikou = latest.chikou_span;
    let chikou_above_cloud = displaced.cloud.is_some_and(|cloud| chikou > cloud.top);
    let chikou_below_cloud = displaced.cloud.is_some_and(|cloud| chikou < cloud.bottom);

    [
        (Condition::PriceAboveCloud, close > latest.cloud_top),
        (Condition::PriceBelowCloud, close < latest.cloud_bottom),
        (Condition::TenkanAboveKijun, latest.tenkan_sen > latest.kijun_sen),
        (Condition::TenkanBelowKijun, latest.tenkan_sen < latest.kijun_sen),
        (Condition::SpanAAboveSpanB, latest.senkou_span_a > latest.senkou_span_b),
        (Condition::SpanABelowSpanB, latest.senkou_span_a < latest.senkou_span_b),
        (Condition::ChikouAbovePrice, chikou > displaced.close),
        (Condition::ChikouBelowPrice, chikou < displaced.close),
        (Condition::ChikouAboveCloud, chikou_above_cloud),
        (Condition::ChikouBelowCloud, chikou_below_cloud),
    ]
    .into_iter()
    .collect()
}
