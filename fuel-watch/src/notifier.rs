use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::TelegramConfig;
use crate::error::FetchError;
use crate::fetcher::{FetchRequest, Fetcher};

/// Destination for price change reports
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, provider: &str, report: &str) -> Result<(), FetchError>;
}

/// Notifier used when no Telegram bot is configured
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, provider: &str, report: &str) -> Result<(), FetchError> {
        tracing::info!(provider = %provider, report = %report, "Price update (no notifier configured)");
        Ok(())
    }
}

/// Posts reports to a Telegram channel through the Bot API
pub struct TelegramNotifier {
    fetcher: Arc<Fetcher>,
    send_message_url: String,
    channel: String,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    description: Option<String>,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig, fetcher: Arc<Fetcher>) -> Self {
        Self {
            fetcher,
            send_message_url: format!(
                "{}/bot{}/sendMessage",
                config.api_base.trim_end_matches('/'),
                config.token
            ),
            channel: config.channel.clone(),
        }
    }

    pub fn message_text(provider: &str, report: &str) -> String {
        format!("[{}] Price update: {}", provider, report)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, provider: &str, report: &str) -> Result<(), FetchError> {
        let text = Self::message_text(provider, report);
        let request = FetchRequest::post_json(
            &self.send_message_url,
            &SendMessage {
                chat_id: &self.channel,
                text: &text,
                parse_mode: "Markdown",
            },
        )?;

        let response: TelegramResponse = self.fetcher.fetch(&request).await?.json()?;
        if !response.ok {
            return Err(FetchError::processing(format!(
                "Telegram rejected message: {}",
                response
                    .description
                    .unwrap_or_else(|| "no description".to_string())
            )));
        }

        tracing::debug!(provider = %provider, channel = %self.channel, "Telegram notification sent");
        Ok(())
    }
}

/// Pick the notifier matching the configuration
pub fn from_config(config: &TelegramConfig, fetcher: Arc<Fetcher>) -> Box<dyn Notifier> {
    if config.is_configured() {
        Box::new(TelegramNotifier::new(config, fetcher))
    } else {
        tracing::warn!("TELEGRAM_TOKEN or TELEGRAM_CHANNEL not set - price updates will only be logged");
        Box::new(LogNotifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::fetcher::tests::test_fetcher;
    use mockito::{Matcher, Server};

    fn telegram_config(api_base: &str) -> TelegramConfig {
        TelegramConfig {
            token: "123:secret".to_string(),
            channel: "@fuel".to_string(),
            api_base: api_base.to_string(),
        }
    }

    #[tokio::test]
    async fn test_telegram_sends_markdown_message() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/bot123:secret/sendMessage")
            .match_body(Matcher::Json(serde_json::json!({
                "chat_id": "@fuel",
                "text": "[Neste] Price update: Diesel: +0.010€/L (1.499 €/L)",
                "parse_mode": "Markdown",
            })))
            .with_status(200)
            .with_body(r#"{"ok":true,"result":{"message_id":1}}"#)
            .expect(1)
            .create_async()
            .await;

        let notifier = TelegramNotifier::new(
            &telegram_config(&format!("{}/", server.url())),
            Arc::new(test_fetcher()),
        );
        notifier
            .notify("Neste", "Diesel: +0.010€/L (1.499 €/L)")
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_telegram_http_error_is_response_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/bot123:secret/sendMessage")
            .with_status(401)
            .with_body(r#"{"ok":false,"description":"Unauthorized"}"#)
            .create_async()
            .await;

        let notifier = TelegramNotifier::new(&telegram_config(&server.url()), Arc::new(test_fetcher()));
        let err = notifier.notify("Viada", "x").await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Response);
    }

    #[tokio::test]
    async fn test_telegram_not_ok_is_processing_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/bot123:secret/sendMessage")
            .with_status(200)
            .with_body(r#"{"ok":false,"description":"chat not found"}"#)
            .create_async()
            .await;

        let notifier = TelegramNotifier::new(&telegram_config(&server.url()), Arc::new(test_fetcher()));
        let err = notifier.notify("Viada", "x").await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Processing);
        assert!(err.to_string().contains("chat not found"));
    }

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        assert!(LogNotifier.notify("Neste", "nothing").await.is_ok());
    }

    #[test]
    fn test_message_text() {
        assert_eq!(
            TelegramNotifier::message_text("Virši", "Diesel: +0.000€/L (1.484 €/L)"),
            "[Virši] Price update: Diesel: +0.000€/L (1.484 €/L)"
        );
    }
}
