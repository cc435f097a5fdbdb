//! Unit tests for the candles → signal pipeline

use kumo::models::signal::SignalClassification;
use kumo::models::strategy::{Condition, RuleKind, StrategyConfig};
use kumo::signals::engine::SignalEngine;
use kumo::InsufficientDataError;

use crate::support::{falling_candles, flat_candles, rising_candles};

#[test]
fn test_evaluate_insufficient_data() {
    let candles = rising_candles(50);
    let err = SignalEngine::evaluate(&candles, &StrategyConfig::reference()).unwrap_err();
    assert_eq!(
        err,
        InsufficientDataError {
            required: 78,
            available: 50
        }
    );
}

#[test]
fn test_rising_series_is_long_with_full_confidence() {
    let candles = rising_candles(120);
    let (result, conditions) =
        SignalEngine::evaluate_with_conditions(&candles, &StrategyConfig::reference()).unwrap();

    assert!(conditions.get(Condition::PriceAboveCloud));
    assert!(conditions.get(Condition::TenkanAboveKijun));
    assert_eq!(result.classification, SignalClassification::Long);
    assert_eq!(result.confidence, 1.0);
    assert_eq!(result.matched_rule, Some(RuleKind::LongEntry));
    assert_eq!(result.matched_conditions.len(), 5);
    assert_eq!(result.matched_conditions.true_conditions().len(), 5);
    assert_eq!(result.snapshot.index, 119);
    assert_eq!(result.price(), candles[119].close);
}

#[test]
fn test_falling_series_is_short_with_full_confidence() {
    let candles = falling_candles(120);
    let result = SignalEngine::evaluate(&candles, &StrategyConfig::reference()).unwrap();
    assert_eq!(result.classification, SignalClassification::Short);
    assert_eq!(result.confidence, 1.0);
}

#[test]
fn test_short_history_without_displaced_cloud_falls_through_to_exit() {
    // 90 bars: no cloud behind the chikou line, so the long entry cannot complete
    let candles = rising_candles(90);
    let (result, conditions) =
        SignalEngine::evaluate_with_conditions(&candles, &StrategyConfig::reference()).unwrap();

    assert!(!conditions.get(Condition::ChikouAboveCloud));
    assert!(!conditions.get(Condition::ChikouBelowCloud));
    assert_eq!(result.classification, SignalClassification::ExitShort);
    assert_eq!(result.confidence, 1.0);
}

#[test]
fn test_flat_series_is_none() {
    let candles = flat_candles(120, 250.0);
    let (result, conditions) =
        SignalEngine::evaluate_with_conditions(&candles, &StrategyConfig::reference()).unwrap();

    assert!(conditions.true_conditions().is_empty());
    assert_eq!(result.classification, SignalClassification::None);
    assert_eq!(result.confidence, 0.0);
    assert!(result.matched_conditions.is_empty());
    assert_eq!(result.matched_rule, None);
}

#[test]
fn test_result_is_deterministic() {
    let candles = rising_candles(150);
    let strategy = StrategyConfig::reference();
    let first = SignalEngine::evaluate(&candles, &strategy).unwrap();
    let second = SignalEngine::evaluate(&candles, &strategy).unwrap();
    assert_eq!(first, second);
}
