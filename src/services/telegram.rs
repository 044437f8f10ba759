// src/services/telegram.rs

//! Alert delivery through the Telegram Bot API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{FeedConfig, TelegramConfig};
use crate::pipeline::Change;
use crate::services::MessageFormatter;
use crate::utils::http::create_async_client;

/// Delivers one alert per detected change.
///
/// Not idempotent: calling twice sends twice.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Format and deliver an alert for a change.
    async fn notify(&self, change: &Change) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Telegram `sendMessage` client.
pub struct TelegramNotifier {
    client: Client,
    endpoint: String,
    chat_id: String,
    disable_web_page_preview: bool,
    formatter: MessageFormatter,
}

impl TelegramNotifier {
    /// Create a notifier from configuration.
    pub fn new(config: &TelegramConfig, feed: &FeedConfig) -> Result<Self> {
        let client = create_async_client("listing-monitor", config.timeout_secs)?;
        Ok(Self::with_client(client, config, MessageFormatter::new(feed)?))
    }

    /// Create a notifier around an existing HTTP client.
    pub fn with_client(client: Client, config: &TelegramConfig, formatter: MessageFormatter) -> Self {
        Self {
            client,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                config.api_base.trim_end_matches('/'),
                config.bot_token.trim()
            ),
            chat_id: config.chat_id.trim().to_string(),
            disable_web_page_preview: config.disable_web_page_preview,
            formatter,
        }
    }

    /// Send a pre-rendered text to the configured chat.
    ///
    /// `id` is only used for error context.
    pub async fn send_text(&self, id: u64, text: &str) -> Result<()> {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: self.disable_web_page_preview,
        };

        // Errors carry the request URL, which embeds the bot token.
        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::delivery(id, e.without_url()))?;

        let status = response.status();
        let body: Option<ApiResponse> = response.json().await.ok();

        match body {
            Some(ApiResponse { ok: true, .. }) if status.is_success() => Ok(()),
            Some(ApiResponse { description, .. }) => Err(AppError::delivery(
                id,
                format!(
                    "HTTP {}: {}",
                    status,
                    description.unwrap_or_else(|| "rejected".to_string())
                ),
            )),
            None => Err(AppError::delivery(
                id,
                format!("HTTP {} with unreadable body", status),
            )),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, change: &Change) -> Result<()> {
        let text = self.formatter.render(change);
        self.send_text(change.listing.id, &text).await?;
        log::info!(
            "[notify] Sent {} alert for listing {} ({})",
            change.kind,
            change.listing.id,
            change.listing.company_name
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::models::{Listing, ListingStatus};
    use crate::pipeline::ChangeKind;
    use crate::storage::FieldChanges;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notifier_for(server: &MockServer, timeout: Duration) -> TelegramNotifier {
        let config = TelegramConfig {
            bot_token: "123:secret".to_string(),
            chat_id: "-10042".to_string(),
            api_base: server.uri(),
            ..TelegramConfig::default()
        };
        let client = Client::builder().timeout(timeout).build().unwrap();
        let formatter = MessageFormatter::new(&FeedConfig::default()).unwrap();
        TelegramNotifier::with_client(client, &config, formatter)
    }

    fn sample_change() -> Change {
        Change {
            listing: Listing {
                id: 106123,
                company_name: "測試有限公司".to_string(),
                listing_date: "02/01/2026".to_string(),
                status: ListingStatus::Active,
                has_phip: false,
                posting_date: "02/01/2026".to_string(),
                documents: vec![],
            },
            kind: ChangeKind::New,
            fields: FieldChanges::default(),
        }
    }

    #[tokio::test]
    async fn test_notify_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:secret/sendMessage"))
            .and(body_partial_json(serde_json::json!({
                "chat_id": "-10042",
                "parse_mode": "HTML"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": { "message_id": 1 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = notifier_for(&server, Duration::from_secs(5));
        notifier.notify(&sample_change()).await.unwrap();
    }

    #[tokio::test]
    async fn test_notify_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: chat not found"
            })))
            .mount(&server)
            .await;

        let notifier = notifier_for(&server, Duration::from_secs(5));
        let err = notifier.notify(&sample_change()).await.unwrap_err();
        assert!(matches!(err, AppError::Delivery { id: 106123, .. }));
        assert!(err.to_string().contains("chat not found"));
    }

    #[tokio::test]
    async fn test_notify_unauthorized_hides_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("nope"))
            .mount(&server)
            .await;

        let notifier = notifier_for(&server, Duration::from_secs(5));
        let err = notifier.notify(&sample_change()).await.unwrap_err();
        assert!(matches!(err, AppError::Delivery { .. }));
        assert!(!err.to_string().contains("secret"));
    }

    #[tokio::test]
    async fn test_notify_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "ok": true }))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let notifier = notifier_for(&server, Duration::from_millis(200));
        let err = notifier.notify(&sample_change()).await.unwrap_err();
        assert!(matches!(err, AppError::Delivery { .. }));
        assert!(!err.to_string().contains("secret"));
    }
}
