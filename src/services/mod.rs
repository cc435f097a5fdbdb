//! External collaborators: market data and notification delivery.

pub mod binance;
pub mod market_data;
pub mod notifier;

pub use binance::BinanceMarketDataProvider;
pub use market_data::{MarketDataProvider, StaticMarketDataProvider};
pub use notifier::{
    DiscordNotifier, LogNotifier, Notifier, SignalNotification, TelegramNotifier,
};
