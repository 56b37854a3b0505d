//! Telegram Bot API client for delivering notifications.
//!
//! Implements [`ChatDelivery`] with a single `sendMessage` call per
//! submission. The bot token is part of the request URL, so transport errors
//! are stripped of their URL before they are logged or returned.

use crate::config::{BotToken, TelegramConfig};
use crate::errors::ConfigError;
use async_trait::async_trait;
use form_relay_core::{ChatDelivery, DeliveryError, DeliveryReceipt, OutboundMessage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// `sendMessage` request body.
#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_thread_id: Option<i64>,
    link_preview_options: LinkPreviewOptions,
}

#[derive(Debug, Serialize)]
struct LinkPreviewOptions {
    is_disabled: bool,
}

/// Envelope of every Bot API response.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error_code: Option<u16>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    result: Option<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

/// Delivery client for the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    api_base_url: String,
    bot_token: BotToken,
    chat_id: String,
    timeout: Duration,
    disable_web_page_preview: bool,
}

impl fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramClient")
            .field("api_base_url", &self.api_base_url)
            .field("bot_token", &self.bot_token)
            .field("chat_id", &self.chat_id)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl TelegramClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the HTTP client cannot be built.
    pub fn new(config: &TelegramConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("form-relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::Invalid {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            http,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
            disable_web_page_preview: config.disable_web_page_preview,
        })
    }

    fn send_message_url(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_base_url,
            self.bot_token.expose()
        )
    }

    fn transport_error(&self, error: reqwest::Error) -> DeliveryError {
        if error.is_timeout() {
            DeliveryError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else {
            DeliveryError::Network {
                message: error.without_url().to_string(),
            }
        }
    }
}

#[async_trait]
impl ChatDelivery for TelegramClient {
    #[instrument(skip(self, message), fields(
        chat_id = %self.chat_id,
        topic_id = ?message.topic_id,
    ))]
    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryReceipt, DeliveryError> {
        let request = SendMessageRequest {
            chat_id: &self.chat_id,
            text: &message.text,
            parse_mode: message.format.parse_mode(),
            message_thread_id: message.topic_id.map(|topic| topic.get()),
            link_preview_options: LinkPreviewOptions {
                is_disabled: self.disable_web_page_preview,
            },
        };

        let response = self
            .http
            .post(self.send_message_url())
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        debug!(status = %status, "Received chat API response");

        let parsed = match serde_json::from_str::<ApiResponse>(&body) {
            Ok(parsed) => parsed,
            Err(e) if status.is_success() => {
                return Err(DeliveryError::InvalidResponse {
                    message: e.to_string(),
                })
            }
            Err(_) => {
                return Err(DeliveryError::Api {
                    status: status.as_u16(),
                    description: status
                        .canonical_reason()
                        .unwrap_or("unknown error")
                        .to_string(),
                })
            }
        };

        if !parsed.ok || !status.is_success() {
            return Err(DeliveryError::Api {
                status: parsed.error_code.unwrap_or_else(|| status.as_u16()),
                description: parsed
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            });
        }

        let message_id = parsed.result.map(|sent| sent.message_id);
        info!(message_id = ?message_id, "Delivered submission notification");

        Ok(DeliveryReceipt { message_id })
    }
}

#[cfg(test)]
#[path = "telegram_tests.rs"]
mod tests;
