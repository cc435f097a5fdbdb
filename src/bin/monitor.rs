//! Kumo Monitor
//!
//! Evaluates the configured instruments on a cron schedule and notifies on
//! signal changes.

use dotenvy::dotenv;
use kumo::config::{MonitorConfig, StateBackend};
use kumo::core::{Monitor, MonitorScheduler};
use kumo::logging;
use kumo::metrics::Metrics;
use kumo::services::{
    BinanceMarketDataProvider, DiscordNotifier, LogNotifier, MarketDataProvider, Notifier,
    TelegramNotifier,
};
use kumo::state::{
    JsonFileStateStore, MemoryStateStore, RedisStateStore, SignalStateManager, StateStore,
};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env if present
    dotenv().ok();

    logging::init_logging();

    let env = kumo::config::get_environment();
    info!("Starting Kumo Monitor");
    info!(environment = %env, "Environment");

    let config = MonitorConfig::from_env()?;
    let strategy = config.strategy()?;

    info!(
        strategy = %strategy.name,
        symbols = ?config.symbols,
        timeframe = %config.timeframe,
        data_points = config.data_points,
        "Monitoring {} with strategy '{}'",
        config.symbols.join(", "),
        strategy.name
    );
    if config.data_points < strategy.params.min_candles() {
        warn!(
            data_points = config.data_points,
            required = strategy.params.min_candles(),
            "DATA_POINTS is below the minimum history; every evaluation will be skipped"
        );
    }

    let metrics = Arc::new(Metrics::new()?);

    let store: Arc<dyn StateStore> = match &config.state_backend {
        StateBackend::File(path) => {
            info!(path = %path.display(), "Using JSON file state store");
            Arc::new(JsonFileStateStore::new(path.clone()))
        }
        StateBackend::Redis { url, key } => {
            info!(key = %key, "Using Redis state store");
            Arc::new(RedisStateStore::connect(url, key.clone()).await?)
        }
        StateBackend::Memory => {
            warn!("Using in-memory state store; signal state will not survive restarts");
            Arc::new(MemoryStateStore::new())
        }
    };

    let states = Arc::new(SignalStateManager::new(store, Some(metrics.clone())));
    states.load().await?;

    let provider: Arc<dyn MarketDataProvider> =
        Arc::new(BinanceMarketDataProvider::with_base_url(&config.binance_base_url));

    let mut notifiers: Vec<Arc<dyn Notifier>> = vec![Arc::new(LogNotifier)];
    if let Some(url) = &config.discord_webhook_url {
        info!("Discord notifications enabled");
        notifiers.push(Arc::new(DiscordNotifier::new(url.clone())));
    }
    if let Some(telegram) = &config.telegram {
        info!("Telegram notifications enabled");
        notifiers.push(Arc::new(TelegramNotifier::new(
            telegram.bot_token.clone(),
            telegram.chat_id.clone(),
        )));
    }

    let mut monitor = Monitor::new(config.symbols.clone(), strategy, provider, states)
        .with_timeframe(config.timeframe.clone())
        .with_data_points(config.data_points)
        .with_metrics(metrics.clone());
    for notifier in notifiers {
        monitor = monitor.with_notifier(notifier);
    }
    let monitor = Arc::new(monitor);

    if config.notify_test_on_startup {
        let delivered = monitor.send_test_notifications().await;
        info!(delivered = delivered, "Startup test notifications: {} delivered", delivered);
    }

    let scheduler = MonitorScheduler::new(monitor.clone(), &config.cron_expression)?;

    if config.run_on_startup {
        info!("Running startup cycle");
        monitor.run_cycle().await;
    }

    scheduler.start().await;
    if let Some(next) = scheduler.next_run() {
        info!(next_run = %next, "Next scheduled cycle at {}", next);
    }

    info!("Monitor started, waiting for shutdown signal...");
    signal::ctrl_c().await?;

    info!("Shutting down monitor...");
    scheduler.stop().await;
    let active = monitor.states().active_signals().await;
    info!(active = ?active, "Active signals at shutdown: {}", active.len());
    if let Ok(text) = metrics.export() {
        tracing::debug!("Final metrics:\n{}", text);
    }
    info!("Monitor stopped");

    Ok(())
}
