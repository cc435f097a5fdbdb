//! Unit tests for environment and strategy-file configuration

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use kumo::config::{load_strategy, parse_strategy, MonitorConfig, StateBackend};
use kumo::models::strategy::{Condition, LogicMode, StrategyConfig};
use kumo::ConfigurationError;

fn config_from(vars: &[(&str, &str)]) -> Result<MonitorConfig, ConfigurationError> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    MonitorConfig::from_lookup(|name| vars.get(name).cloned())
}

fn parse(json: &str) -> Result<StrategyConfig, ConfigurationError> {
    parse_strategy(json, Path::new("strategy_01.json"))
}

#[test]
fn test_env_defaults() {
    let config = config_from(&[]).unwrap();
    assert_eq!(config.symbols, vec!["BTC/USDT", "ETH/USDT", "SOL/USDT"]);
    assert_eq!(config.timeframe, "4h");
    assert_eq!(config.data_points, 300);
    assert_eq!(
        config.state_backend,
        StateBackend::File(PathBuf::from("data/state/signal_states.json"))
    );
    assert_eq!(config.cron_expression, "15 0 */4 * * *");
    assert!(config.run_on_startup);
    assert!(!config.notify_test_on_startup);
    assert!(config.strategy_path.is_none());
    assert!(config.discord_webhook_url.is_none());
    assert!(config.telegram.is_none());
}

#[test]
fn test_env_overrides() {
    let config = config_from(&[
        ("SYMBOLS", " btc/usdt , ada/usdt ,"),
        ("DATA_POINTS", "500"),
        ("STATE_BACKEND", "Redis"),
        ("REDIS_URL", "redis://cache:6379"),
        ("RUN_ON_STARTUP", "no"),
        ("NOTIFY_TEST_ON_STARTUP", "true"),
        ("TELEGRAM_BOT_TOKEN", "123:abc"),
        ("TELEGRAM_CHAT_ID", "42"),
    ])
    .unwrap();

    assert_eq!(config.symbols, vec!["BTC/USDT", "ADA/USDT"]);
    assert_eq!(config.data_points, 500);
    assert_eq!(
        config.state_backend,
        StateBackend::Redis {
            url: "redis://cache:6379".to_string(),
            key: "kumo:signal_states".to_string()
        }
    );
    assert!(!config.run_on_startup);
    assert!(config.notify_test_on_startup);
    assert_eq!(config.telegram.unwrap().chat_id, "42");
}

#[test]
fn test_telegram_needs_token_and_chat() {
    let config = config_from(&[("TELEGRAM_BOT_TOKEN", "123:abc")]).unwrap();
    assert!(config.telegram.is_none());
}

#[test]
fn test_malformed_env_values_are_rejected() {
    for (name, value) in [
        ("DATA_POINTS", "lots"),
        ("DATA_POINTS", "0"),
        ("DATA_POINTS", "1001"),
        ("NOTIFY_TEST_ON_STARTUP", "sometimes"),
        ("RUN_ON_STARTUP", "maybe"),
        ("STATE_BACKEND", "sqlite"),
        ("SYMBOLS", " , "),
    ] {
        let err = config_from(&[(name, value)]).unwrap_err();
        assert!(
            matches!(err, ConfigurationError::InvalidEnv { name: ref n, .. } if n == name),
            "{}={} gave {:?}",
            name,
            value,
            err
        );
    }
}

#[test]
fn test_data_points_up_to_klines_limit() {
    let config = config_from(&[("DATA_POINTS", "1000")]).unwrap();
    assert_eq!(config.data_points, 1000);
}

#[test]
fn test_no_strategy_path_uses_reference() {
    let config = config_from(&[]).unwrap();
    assert_eq!(config.strategy().unwrap(), StrategyConfig::reference());
}

#[test]
fn test_parse_full_strategy() {
    let strategy = parse(
        r#"{
            "name": "strategy_01",
            "description": "trend following",
            "ichimoku": {"tenkan_period": 7, "kijun_period": 22, "senkou_b_period": 44, "displacement": 22},
            "rules": {
                "long_entry": {"conditions": ["Price Above Cloud", "tenkan-above-kijun"], "logic": "ALL"},
                "short_entry": {"conditions": ["price_below_cloud"], "logic": "all"},
                "long_exit": {"conditions": ["tenkan_below_kijun", "price__below_cloud"], "logic": "any"},
                "short_exit": {"conditions": ["TENKAN_ABOVE_KIJUN"], "logic": "ANY"}
            }
        }"#,
    )
    .unwrap();

    assert_eq!(strategy.name, "strategy_01");
    assert_eq!(strategy.params.tenkan_period(), 7);
    assert_eq!(strategy.params.min_candles(), 66);
    assert_eq!(
        strategy.rules.long_entry.conditions,
        vec![Condition::PriceAboveCloud, Condition::TenkanAboveKijun]
    );
    assert_eq!(strategy.rules.short_entry.logic, LogicMode::All);
    assert_eq!(strategy.rules.long_exit.logic, LogicMode::Any);
    assert_eq!(strategy.rules.long_exit.conditions[1], Condition::PriceBelowCloud);
}

#[test]
fn test_omitted_parts_take_defaults() {
    let strategy = parse(r#"{"rules": {"long_entry": {"conditions": ["price_above_cloud"]}}}"#).unwrap();
    assert_eq!(strategy.name, "strategy_01");
    assert_eq!(strategy.params, kumo::IchimokuParams::default());
    assert_eq!(strategy.rules.long_entry.logic, LogicMode::All);
    assert!(strategy.rules.short_entry.conditions.is_empty());
    assert!(strategy.rules.short_exit.conditions.is_empty());
}

#[test]
fn test_unknown_condition_is_rejected() {
    let err = parse(r#"{"rules": {"short_exit": {"conditions": ["price_above_clouds"]}}}"#).unwrap_err();
    match err {
        ConfigurationError::UnknownCondition { rule, name } => {
            assert_eq!(rule, "short_exit");
            assert_eq!(name, "price_above_clouds");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_invalid_logic_mode_is_rejected() {
    let err = parse(r#"{"rules": {"long_entry": {"conditions": ["price_above_cloud"], "logic": "MOST"}}}"#)
        .unwrap_err();
    assert!(matches!(
        err,
        ConfigurationError::InvalidLogicMode { ref rule, ref mode } if rule == "long_entry" && mode == "MOST"
    ));
}

#[test]
fn test_zero_period_is_rejected() {
    let err = parse(r#"{"ichimoku": {"kijun_period": 0}}"#).unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidParameter { .. }));
}

#[test]
fn test_malformed_json_is_parse_error() {
    let err = parse("{ not json").unwrap_err();
    assert!(matches!(err, ConfigurationError::Parse { .. }));
}

#[test]
fn test_load_strategy_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.json");
    let mut file = std::fs::File::create(&path).unwrap();
    write!(
        file,
        r#"{{"rules": {{"long_entry": {{"conditions": ["span_a_above_span_b"], "logic": "ANY"}}}}}}"#
    )
    .unwrap();

    let strategy = load_strategy(&path).unwrap();
    assert_eq!(strategy.name, "custom");
    assert_eq!(strategy.rules.long_entry.conditions, vec![Condition::SpanAAboveSpanB]);
}

#[test]
fn test_missing_strategy_file_is_io_error() {
    let err = load_strategy(Path::new("/nonexistent/strategy.json")).unwrap_err();
    assert!(matches!(err, ConfigurationError::Io { .. }));
}
