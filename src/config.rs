//! Configuration loading
//!
//! Two layers, both validated at start-up:
//! - process environment (optionally seeded from `.env`) for the monitor
//! - a JSON strategy file for indicator periods and rules

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

use crate::error::ConfigurationError;
use crate::models::indicators::IchimokuParams;
use crate::models::strategy::{Condition, LogicMode, Rule, RuleKind, StrategyConfig, StrategyRules};
use crate::services::binance::{DEFAULT_BASE_URL, MAX_KLINES_LIMIT};

pub const DEFAULT_SYMBOLS: &str = "BTC/USDT,ETH/USDT,SOL/USDT";
pub const DEFAULT_TIMEFRAME: &str = "4h";
pub const DEFAULT_DATA_POINTS: usize = 300;
pub const DEFAULT_STATE_FILE: &str = "data/state/signal_states.json";
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_REDIS_KEY: &str = "kumo:signal_states";
/// hh:00:15 UTC every four hours, just after the 4h candle closes.
pub const DEFAULT_MONITOR_CRON: &str = "15 0 */4 * * *";

/// Deployment environment name (`ENVIRONMENT`, default `sandbox`).
pub fn get_environment() -> String {
    std::env::var("ENVIRONMENT")
        .ok()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "sandbox".to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub enum StateBackend {
    File(PathBuf),
    Redis { url: String, key: String },
    Memory,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub symbols: Vec<String>,
    pub timeframe: String,
    pub data_points: usize,
    pub strategy_path: Option<PathBuf>,
    pub state_backend: StateBackend,
    pub cron_expression: String,
    pub run_on_startup: bool,
    pub notify_test_on_startup: bool,
    pub binance_base_url: String,
    pub discord_webhook_url: Option<String>,
    pub telegram: Option<TelegramConfig>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn opt(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn str(&self, name: &str, default: &str) -> String {
        self.opt(name).unwrap_or_else(|| default.to_string())
    }

    fn usize(&self, name: &str, default: usize) -> Result<usize, ConfigurationError> {
        match self.opt(name) {
            Some(raw) => raw.parse().map_err(|_| ConfigurationError::InvalidEnv {
                name: name.to_string(),
                value: raw,
            }),
            None => Ok(default),
        }
    }

    fn bool(&self, name: &str, default: bool) -> Result<bool, ConfigurationError> {
        match self.opt(name) {
            Some(raw) => match raw.to_lowercase().as_str() {
                "1" | "true" | "yes" | "y" | "on" => Ok(true),
                "0" | "false" | "no" | "n" | "off" => Ok(false),
                _ => Err(ConfigurationError::InvalidEnv {
                    name: name.to_string(),
                    value: raw,
                }),
            },
            None => Ok(default),
        }
    }
}

impl MonitorConfig {
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };

        let symbols: Vec<String> = env
            .str("SYMBOLS", DEFAULT_SYMBOLS)
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        if symbols.is_empty() {
            return Err(ConfigurationError::InvalidEnv {
                name: "SYMBOLS".to_string(),
                value: env.str("SYMBOLS", ""),
            });
        }

        let data_points = env.usize("DATA_POINTS", DEFAULT_DATA_POINTS)?;
        if data_points == 0 || data_points > MAX_KLINES_LIMIT {
            return Err(ConfigurationError::InvalidEnv {
                name: "DATA_POINTS".to_string(),
                value: data_points.to_string(),
            });
        }

        let backend = env.str("STATE_BACKEND", "file").to_lowercase();
        let state_backend = match backend.as_str() {
            "file" => StateBackend::File(PathBuf::from(env.str("STATE_FILE_PATH", DEFAULT_STATE_FILE))),
            "redis" => StateBackend::Redis {
                url: env.str("REDIS_URL", DEFAULT_REDIS_URL),
                key: env.str("STATE_REDIS_KEY", DEFAULT_REDIS_KEY),
            },
            "memory" => StateBackend::Memory,
            _ => {
                return Err(ConfigurationError::InvalidEnv {
                    name: "STATE_BACKEND".to_string(),
                    value: backend,
                })
            }
        };

        let telegram = match (env.opt("TELEGRAM_BOT_TOKEN"), env.opt("TELEGRAM_CHAT_ID")) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramConfig { bot_token, chat_id }),
            _ => None,
        };

        Ok(Self {
            symbols,
            timeframe: env.str("TIMEFRAME", DEFAULT_TIMEFRAME),
            data_points,
            strategy_path: env.opt("STRATEGY_CONFIG_PATH").map(PathBuf::from),
            state_backend,
            cron_expression: env.str("MONITOR_CRON", DEFAULT_MONITOR_CRON),
            run_on_startup: env.bool("RUN_ON_STARTUP", true)?,
            notify_test_on_startup: env.bool("NOTIFY_TEST_ON_STARTUP", false)?,
            binance_base_url: env.str("BINANCE_BASE_URL", DEFAULT_BASE_URL),
            discord_webhook_url: env.opt("DISCORD_WEBHOOK_URL"),
            telegram,
        })
    }

    /// Strategy from `STRATEGY_CONFIG_PATH`, or the built-in reference strategy.
    pub fn strategy(&self) -> Result<StrategyConfig, ConfigurationError> {
        match &self.strategy_path {
            Some(path) => load_strategy(path),
            None => {
                info!("No strategy file configured, using built-in reference strategy");
                Ok(StrategyConfig::reference())
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawStrategy {
    name: Option<String>,
    #[serde(default)]
    description: String,
    ichimoku: Option<RawParams>,
    #[serde(default)]
    rules: RawRules,
}

#[derive(Debug, Default, Deserialize)]
struct RawParams {
    tenkan_period: Option<usize>,
    kijun_period: Option<usize>,
    senkou_b_period: Option<usize>,
    displacement: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct RawRules {
    long_entry: Option<RawRule>,
    short_entry: Option<RawRule>,
    long_exit: Option<RawRule>,
    short_exit: Option<RawRule>,
}

#[derive(Debug, Default, Deserialize)]
struct RawRule {
    #[serde(default)]
    conditions: Vec<String>,
    logic: Option<String>,
}

fn build_params(raw: Option<RawParams>) -> Result<IchimokuParams, ConfigurationError> {
    let defaults = IchimokuParams::default();
    let raw = raw.unwrap_or_default();
    IchimokuParams::new(
        raw.tenkan_period.unwrap_or(defaults.tenkan_period()),
        raw.kijun_period.unwrap_or(defaults.kijun_period()),
        raw.senkou_b_period.unwrap_or(defaults.senkou_b_period()),
        raw.displacement.unwrap_or(defaults.displacement()),
    )
}

fn build_rule(kind: RuleKind, raw: Option<RawRule>) -> Result<Rule, ConfigurationError> {
    let Some(raw) = raw else {
        return Ok(Rule::default());
    };

    let conditions = raw
        .conditions
        .iter()
        .map(|name| {
            Condition::from_str(name).map_err(|name| ConfigurationError::UnknownCondition {
                rule: kind.as_str().to_string(),
                name,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let logic = match raw.logic {
        Some(mode) => {
            LogicMode::from_str(&mode).map_err(|mode| ConfigurationError::InvalidLogicMode {
                rule: kind.as_str().to_string(),
                mode,
            })?
        }
        None => LogicMode::All,
    };

    Ok(Rule::new(conditions, logic))
}

/// Parse and validate a strategy document. `origin` is only used in errors.
pub fn parse_strategy(json: &str, origin: &Path) -> Result<StrategyConfig, ConfigurationError> {
    let raw: RawStrategy =
        serde_json::from_str(json).map_err(|source| ConfigurationError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;

    let rules = StrategyRules {
        long_entry: build_rule(RuleKind::LongEntry, raw.rules.long_entry)?,
        short_entry: build_rule(RuleKind::ShortEntry, raw.rules.short_entry)?,
        long_exit: build_rule(RuleKind::LongExit, raw.rules.long_exit)?,
        short_exit: build_rule(RuleKind::ShortExit, raw.rules.short_exit)?,
    };

    Ok(StrategyConfig {
        name: raw.name.unwrap_or_else(|| {
            origin
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "strategy".to_string())
        }),
        description: raw.description,
        params: build_params(raw.ichimoku)?,
        rules,
    })
}

pub fn load_strategy(path: &Path) -> Result<StrategyConfig, ConfigurationError> {
    let json = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let strategy = parse_strategy(&json, path)?;

    info!(
        strategy = %strategy.name,
        path = %path.display(),
        "Loaded strategy {} from {}",
        strategy.name,
        path.display()
    );
    Ok(strategy)
}
