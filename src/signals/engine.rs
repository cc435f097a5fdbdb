//! Signal evaluation pipeline: candles → indicators → conditions → classified signal.

use crate::error::InsufficientDataError;
use crate::indicators::ichimoku;
use crate::models::indicators::Candle;
use crate::models::signal::SignalResult;
use crate::models::strategy::{ConditionMap, StrategyConfig};
use crate::signals::conditions::{self, DisplacedBar};
use crate::strategies::evaluator::StrategyEvaluator;

pub struct SignalEngine;

impl SignalEngine {
    /// Classify the latest completed candle using a strategy.
    pub fn evaluate(
        candles: &[Candle],
        strategy: &StrategyConfig,
    ) -> Result<SignalResult, InsufficientDataError> {
        Self::evaluate_with_conditions(candles, strategy).map(|(result, _)| result)
    }

    /// Evaluate and also return the full condition map (for logging/debugging)
    pub fn evaluate_with_conditions(
        candles: &[Candle],
        strategy: &StrategyConfig,
    ) -> Result<(SignalResult, ConditionMap), InsufficientDataError> {
        let params = &strategy.params;
        let insufficient = InsufficientDataError {
            required: params.min_candles(),
            available: candles.len(),
        };

        let snapshots = ichimoku::compute(candles, params)?;
        let latest = *snapshots.last().ok_or(insufficient)?;
        let displaced =
            DisplacedBar::locate(candles, &snapshots, &latest, params).ok_or(insufficient)?;

        let condition_map = conditions::evaluate(&latest, &displaced);
        let result = StrategyEvaluator::classify(&condition_map, &strategy.rules, latest);

        Ok((result, condition_map))
    }
}
