//! Discord and Telegram delivery against mocked endpoints

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kumo::models::signal::SignalClassification;
use kumo::models::state::SignalState;
use kumo::services::notifier::{
    DiscordNotifier, LogNotifier, Notifier, SignalNotification, TelegramNotifier,
};
use kumo::signals::engine::SignalEngine;
use kumo::state::tracker::StateTracker;
use kumo::{NotifyError, StrategyConfig};

use crate::test_utils::rising_candles;

fn long_notification() -> SignalNotification {
    let result = SignalEngine::evaluate(&rising_candles(120), &StrategyConfig::reference()).unwrap();
    let prior = SignalState {
        current_signal: SignalClassification::ExitLong,
        ..SignalState::initial(result.snapshot.timestamp)
    };
    let transition = StateTracker::apply("BTC/USDT", &result, Some(&prior));
    SignalNotification::new("BTC/USDT", &result, &transition)
}

#[test]
fn notification_reflects_engine_outputs() {
    let n = long_notification();
    assert_eq!(n.signal, SignalClassification::Long);
    assert_eq!(n.previous_signal, SignalClassification::ExitLong);
    assert_eq!(n.transition_count, 1);
    assert_eq!(n.price, 219.0);
    assert!((n.stop_loss - 219.0 * 0.96).abs() < 1e-9);
    assert_eq!(n.matched_conditions.len(), 5);

    let text = n.format_text();
    assert!(text.contains("*LONG Signal: BTC/USDT*"));
    assert!(text.contains("*Price:* $219.00"));
    assert!(text.contains("*Confidence:* 100.0%"));
    assert!(text.contains("*Stop Loss (4%):* $210.24"));
}

/// Unescaped `_` outside `*bold*` spans; Telegram reads each one as an italic marker.
fn stray_underscores(text: &str) -> usize {
    let mut in_bold = false;
    let mut escaped = false;
    let mut stray = 0;
    for ch in text.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '*' => in_bold = !in_bold,
            '_' if !in_bold => stray += 1,
            _ => {}
        }
    }
    stray
}

#[test]
fn telegram_text_has_no_stray_italic_markers() {
    let n = long_notification();
    assert_eq!(n.previous_signal, SignalClassification::ExitLong);
    assert!(n.matched_conditions.iter().any(|c| c.contains('_')));

    let text = n.format_text();
    assert_eq!(stray_underscores(&text), 0, "{}", text);
    assert!(text.contains("Previous: EXIT LONG"));
    assert!(text.contains("price\\_above\\_cloud"));
}

#[test]
fn exit_signal_title_uses_display_name() {
    let n = SignalNotification {
        signal: SignalClassification::ExitShort,
        previous_signal: SignalClassification::Short,
        ..long_notification()
    };
    let text = n.format_text();
    assert!(text.contains("*EXIT SHORT Signal: BTC/USDT*"));
    assert_eq!(stray_underscores(&text), 0);
}

#[tokio::test]
async fn log_notifier_always_succeeds() {
    LogNotifier.send(&long_notification()).await.unwrap();
}

#[tokio::test]
async fn discord_posts_one_coloured_embed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/webhooks/1/token"))
        .and(body_partial_json(json!({
            "embeds": [{"color": 0x00FF00, "title": "🚀 LONG Signal: BTC/USDT"}]
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = DiscordNotifier::new(format!("{}/api/webhooks/1/token", server.uri()));
    notifier.send(&long_notification()).await.unwrap();
}

#[test]
fn discord_payload_carries_price_and_cloud() {
    let payload = DiscordNotifier::payload(&long_notification());
    let embed = &payload["embeds"][0];
    assert!(embed["description"].as_str().unwrap().contains("$219.00"));
    assert_eq!(embed["fields"].as_array().unwrap().len(), 3);
    assert_eq!(embed["fields"][1]["name"], "Cloud Boundaries");
}

#[tokio::test]
async fn telegram_sends_markdown_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .and(body_partial_json(json!({
            "chat_id": "42",
            "parse_mode": "Markdown",
            "disable_web_page_preview": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = TelegramNotifier::with_api_base(server.uri(), "123:abc", "42");
    notifier.send(&long_notification()).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body["text"].as_str().unwrap().contains("LONG Signal: BTC/USDT"));
}

#[tokio::test]
async fn rejected_delivery_is_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let notifier = TelegramNotifier::with_api_base(server.uri(), "bad", "42");
    let err = notifier.send(&long_notification()).await.unwrap_err();
    assert!(matches!(err, NotifyError::Status { status: 401, .. }));
}

#[tokio::test]
async fn discord_test_message_posts_plain_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/webhooks/1/token"))
        .and(body_partial_json(json!({
            "content": "✅ Discord webhook connection test successful!"
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = DiscordNotifier::new(format!("{}/api/webhooks/1/token", server.uri()));
    notifier.send_test().await.unwrap();
}

#[tokio::test]
async fn telegram_test_message_hits_send_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .and(body_partial_json(json!({
            "chat_id": "42",
            "text": "✅ Telegram bot connection test successful!"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = TelegramNotifier::with_api_base(server.uri(), "123:abc", "42");
    notifier.send_test().await.unwrap();
}

#[tokio::test]
async fn rejected_test_message_is_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Unknown Webhook"))
        .mount(&server)
        .await;

    let notifier = DiscordNotifier::new(format!("{}/api/webhooks/1/token", server.uri()));
    let err = notifier.send_test().await.unwrap_err();
    assert!(matches!(err, NotifyError::Status { status: 404, .. }));
}
