//! Signal notifications and their delivery channels
//!
//! Notifications are built only from engine outputs. Rounding for display
//! happens here and nowhere upstream.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tracing::info;

use crate::error::NotifyError;
use crate::models::indicators::CloudColor;
use crate::models::signal::{SignalClassification, SignalResult};
use crate::state::tracker::Transition;

/// Distance of the reference stop from the signal price.
pub const STOP_LOSS_FRACTION: f64 = 0.04;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const TEST_MESSAGE_DISCORD: &str = "✅ Discord webhook connection test successful!";
const TEST_MESSAGE_TELEGRAM: &str = "✅ Telegram bot connection test successful!";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalNotification {
    pub symbol: String,
    pub signal: SignalClassification,
    pub previous_signal: SignalClassification,
    pub transition_count: u64,
    pub confidence: f64,
    pub price: f64,
    pub stop_loss: f64,
    pub tenkan_sen: f64,
    pub kijun_sen: f64,
    pub cloud_top: f64,
    pub cloud_bottom: f64,
    pub cloud_color: CloudColor,
    pub matched_conditions: Vec<String>,
    /// Open time of the candle the signal was computed on.
    pub candle_time: DateTime<Utc>,
}

impl SignalNotification {
    pub fn new(symbol: &str, result: &SignalResult, transition: &Transition) -> Self {
        let snapshot = &result.snapshot;
        Self {
            symbol: symbol.to_string(),
            signal: result.classification,
            previous_signal: transition.state.previous_signal,
            transition_count: transition.state.transition_count,
            confidence: result.confidence,
            price: snapshot.close,
            stop_loss: stop_loss(snapshot.close, result.classification),
            tenkan_sen: snapshot.tenkan_sen,
            kijun_sen: snapshot.kijun_sen,
            cloud_top: snapshot.cloud_top,
            cloud_bottom: snapshot.cloud_bottom,
            cloud_color: snapshot.cloud_color,
            matched_conditions: result
                .matched_conditions
                .true_conditions()
                .into_iter()
                .map(|c| c.as_str().to_string())
                .collect(),
            candle_time: snapshot.timestamp,
        }
    }

    pub fn title(&self) -> String {
        format!("{} {} Signal: {}", emoji(self.signal), self.signal, self.symbol)
    }

    /// Telegram legacy Markdown body.
    ///
    /// Signal names are shown with spaces and condition names are escaped,
    /// since a bare `_` opens an italic entity.
    pub fn format_text(&self) -> String {
        let mut text = format!(
            "{} *{} Signal: {}*\n",
            emoji(self.signal),
            signal_label(self.signal),
            self.symbol
        );
        text.push_str(&format!("Previous: {}\n\n", signal_label(self.previous_signal)));
        text.push_str(&format!("*Price:* {}\n", format_usd(self.price)));
        text.push_str(&format!("*Confidence:* {}\n", format_percent(self.confidence)));
        text.push_str(&format!(
            "*Stop Loss (4%):* {}\n\n",
            format_usd(self.stop_loss)
        ));
        text.push_str("*Ichimoku*\n");
        text.push_str(&format!("Tenkan-sen: {}\n", format_usd(self.tenkan_sen)));
        text.push_str(&format!("Kijun-sen: {}\n", format_usd(self.kijun_sen)));
        text.push_str(&format!("Cloud: {}\n", cloud_label(self.cloud_color)));
        text.push_str(&format!(
            "Cloud range: {} / {}\n",
            format_usd(self.cloud_top),
            format_usd(self.cloud_bottom)
        ));
        if !self.matched_conditions.is_empty() {
            let matched: Vec<String> = self
                .matched_conditions
                .iter()
                .map(|c| escape_markdown(c))
                .collect();
            text.push_str(&format!("\nMatched: {}\n", matched.join(", ")));
        }
        text
    }
}

/// Reference stop 4% against the signal direction.
pub fn stop_loss(price: f64, signal: SignalClassification) -> f64 {
    match signal {
        SignalClassification::Long | SignalClassification::ExitShort => {
            price * (1.0 - STOP_LOSS_FRACTION)
        }
        _ => price * (1.0 + STOP_LOSS_FRACTION),
    }
}

fn emoji(signal: SignalClassification) -> &'static str {
    match signal {
        SignalClassification::Long => "🚀",
        SignalClassification::Short => "📉",
        SignalClassification::ExitLong => "🛑",
        SignalClassification::ExitShort => "✅",
        SignalClassification::None => "📊",
    }
}

/// `EXIT_LONG` -> `EXIT LONG`
fn signal_label(signal: SignalClassification) -> String {
    signal.as_str().replace('_', " ")
}

/// Escape the legacy Markdown control characters for text outside entities.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn cloud_label(color: CloudColor) -> &'static str {
    match color {
        CloudColor::Green => "Green",
        CloudColor::Red => "Red",
    }
}

/// Discord embed colour per classification.
pub fn embed_color(signal: SignalClassification) -> u32 {
    match signal {
        SignalClassification::Long => 0x00FF00,
        SignalClassification::Short => 0xFF0000,
        SignalClassification::ExitLong => 0xFFA500,
        SignalClassification::ExitShort => 0x00CED1,
        SignalClassification::None => 0x3498DB,
    }
}

/// `1234.5` -> `$1,234.50`
pub fn format_usd(value: f64) -> String {
    let rounded = format!("{:.2}", value.abs());
    let (int_part, frac_part) = rounded.split_once('.').unwrap_or((rounded.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, frac_part)
}

pub fn format_percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

async fn check_status(response: reqwest::Response) -> Result<(), NotifyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(NotifyError::Status {
        status: status.as_u16(),
        body,
    })
}

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_default()
}

#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, notification: &SignalNotification) -> Result<(), NotifyError>;

    /// Connectivity check sent at start-up. Channels with nothing to verify succeed.
    async fn send_test(&self) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Writes notifications to the log only.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, notification: &SignalNotification) -> Result<(), NotifyError> {
        info!(
            symbol = %notification.symbol,
            signal = %notification.signal,
            previous = %notification.previous_signal,
            confidence = notification.confidence,
            price = notification.price,
            stop_loss = notification.stop_loss,
            "{}",
            notification.title()
        );
        Ok(())
    }

    async fn send_test(&self) -> Result<(), NotifyError> {
        info!("Log notifier ready");
        Ok(())
    }
}

pub struct DiscordNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl DiscordNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            client: http_client(),
            webhook_url: webhook_url.into(),
        }
    }

    pub fn payload(notification: &SignalNotification) -> serde_json::Value {
        let n = notification;
        let description = format!(
            "**Price:** {}\n**Confidence:** {}\n**Stop Loss (4%):** {}",
            format_usd(n.price),
            format_percent(n.confidence),
            format_usd(n.stop_loss)
        );

        json!({
            "embeds": [{
                "title": n.title(),
                "description": description,
                "color": embed_color(n.signal),
                "fields": [
                    {
                        "name": "Ichimoku Indicators",
                        "value": format!(
                            "**Tenkan-sen:** {}\n**Kijun-sen:** {}\n**Cloud:** {}",
                            format_usd(n.tenkan_sen),
                            format_usd(n.kijun_sen),
                            cloud_label(n.cloud_color)
                        ),
                        "inline": true
                    },
                    {
                        "name": "Cloud Boundaries",
                        "value": format!(
                            "**Top:** {}\n**Bottom:** {}",
                            format_usd(n.cloud_top),
                            format_usd(n.cloud_bottom)
                        ),
                        "inline": true
                    },
                    {
                        "name": "Transition",
                        "value": format!("{} → {} (#{})", n.previous_signal, n.signal, n.transition_count),
                        "inline": false
                    }
                ],
                "footer": {"text": "Ichimoku Signal Monitor"},
                "timestamp": n.candle_time.to_rfc3339()
            }]
        })
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    fn name(&self) -> &str {
        "discord"
    }

    async fn send(&self, notification: &SignalNotification) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&Self::payload(notification))
            .send()
            .await?;
        check_status(response).await
    }

    async fn send_test(&self) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&json!({ "content": TEST_MESSAGE_DISCORD }))
            .send()
            .await?;
        check_status(response).await
    }
}

pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self::with_api_base(TELEGRAM_API_BASE, bot_token, chat_id)
    }

    pub fn with_api_base(
        api_base: impl Into<String>,
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Self {
        Self {
            client: http_client(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
        }
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, notification: &SignalNotification) -> Result<(), NotifyError> {
        let body = json!({
            "chat_id": self.chat_id,
            "text": notification.format_text(),
            "parse_mode": "Markdown",
            "disable_web_page_preview": true
        });

        let response = self
            .client
            .post(self.send_message_url())
            .json(&body)
            .send()
            .await?;
        check_status(response).await
    }

    async fn send_test(&self) -> Result<(), NotifyError> {
        let body = json!({
            "chat_id": self.chat_id,
            "text": TEST_MESSAGE_TELEGRAM
        });

        let response = self
            .client
            .post(self.send_message_url())
            .json(&body)
            .send()
            .await?;
        check_status(response).await
    }
}
