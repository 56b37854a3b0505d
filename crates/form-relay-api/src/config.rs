//! Configuration types for the HTTP service

use crate::errors::ConfigError;
use form_relay_core::{
    ComposerConfig, FieldKeys, MessageComposer, PayloadNormalizer, RoutingTable,
};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use url::Url;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Inbound webhook settings
    pub webhook: WebhookConfig,

    /// Outbound chat API settings
    pub telegram: TelegramConfig,

    /// Category → topic routing
    pub routing: RoutingConfig,

    /// Message layout and markup
    pub message: ComposerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Validate the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.webhook.validate()?;
        self.telegram.validate()?;
        self.routing_table()?;
        Ok(())
    }

    /// Build the routing table from `routing.topics`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Routing`] when a key is not a known category.
    pub fn routing_table(&self) -> Result<RoutingTable, ConfigError> {
        let entries = self
            .routing
            .topics
            .iter()
            .map(|(name, topic)| (name.as_str(), *topic));
        Ok(RoutingTable::from_names(entries)?)
    }

    pub fn normalizer(&self) -> PayloadNormalizer {
        PayloadNormalizer::new(self.webhook.fields.clone())
            .with_raw_request_paths(self.webhook.raw_request_paths.clone())
    }

    pub fn composer(&self) -> MessageComposer {
        MessageComposer::new(self.message.clone())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Maximum request size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Inbound webhook configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Webhook endpoint path
    pub endpoint_path: String,

    /// Paths searched, in order, for an embedded raw-request string
    pub raw_request_paths: Vec<String>,

    /// Question keys for each extracted field
    pub fields: FieldKeys,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            endpoint_path: "/jotform".to_string(),
            raw_request_paths: form_relay_core::payload::DEFAULT_RAW_REQUEST_PATHS
                .iter()
                .map(|path| path.to_string())
                .collect(),
            fields: FieldKeys::default(),
        }
    }
}

impl WebhookConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.endpoint_path.starts_with('/') || self.endpoint_path.len() < 2 {
            return Err(ConfigError::Invalid {
                message: format!(
                    "webhook.endpoint_path '{}' must start with '/' and name a path",
                    self.endpoint_path
                ),
            });
        }
        Ok(())
    }
}

/// Bot credential for the chat API.
///
/// Redacted in `Debug` and `Serialize` output and wiped from memory on drop.
#[derive(Clone, Default, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct BotToken(String);

impl BotToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for building request URLs only.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for BotToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BotToken(<REDACTED>)")
    }
}

impl Serialize for BotToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("<REDACTED>")
    }
}

/// Chat API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot credential
    pub bot_token: BotToken,

    /// Destination chat (numeric id or `@channel` name)
    pub chat_id: String,

    /// Bot API base URL
    pub api_base_url: String,

    /// Request timeout in seconds
    pub timeout_seconds: u64,

    /// Suppress link previews under the message
    pub disable_web_page_preview: bool,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: BotToken::default(),
            chat_id: String::new(),
            api_base_url: "https://api.telegram.org".to_string(),
            timeout_seconds: 10,
            disable_web_page_preview: true,
        }
    }
}

impl TelegramConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.bot_token.is_empty() {
            return Err(ConfigError::Missing {
                key: "telegram.bot_token".to_string(),
            });
        }

        if self.chat_id.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "telegram.chat_id".to_string(),
            });
        }

        let base = Url::parse(&self.api_base_url).map_err(|e| ConfigError::Invalid {
            message: format!("telegram.api_base_url '{}': {}", self.api_base_url, e),
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                message: format!(
                    "telegram.api_base_url must use http or https, got '{}'",
                    base.scheme()
                ),
            });
        }

        if self.timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                message: "telegram.timeout_seconds must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

/// Category → topic routing configuration
///
/// Keys are category names exactly as the form submits them. A `null`
/// topic keeps the category recognized but posts to the general thread.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RoutingConfig {
    pub topics: BTreeMap<String, Option<i64>>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
