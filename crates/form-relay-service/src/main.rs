//! # Form Relay Service
//!
//! Binary entry point for the Form Relay HTTP service.
//!
//! This executable:
//! - Loads configuration from files and environment
//! - Initializes logging
//! - Builds the Telegram client and submission relay
//! - Starts the HTTP server from form-relay-api

use form_relay_api::{start_server, LoggingConfig, ServiceConfig, ServiceError, TelegramClient};
use form_relay_core::SubmissionRelay;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Environment variable naming an extra configuration file.
const CONFIG_FILE_ENV: &str = "FR_CONFIG_FILE";

/// Prefix for environment overrides, e.g. `FR__SERVER__PORT=9090`.
const ENV_PREFIX: &str = "FR";

#[tokio::main]
async fn main() {
    // -------------------------------------------------------------------------
    // Load configuration
    //
    // Sources (later sources override earlier ones):
    //  1. /etc/form-relay/service.yaml
    //  2. ./config/service.yaml
    //  3. Path given by FR_CONFIG_FILE
    //  4. Environment variables prefixed FR__ (double-underscore separator)
    //     e.g. FR__TELEGRAM__CHAT_ID=-1001234567890
    //
    // Missing files are fine; every field has a default. Credentials have no
    // default, so validation fails until they are supplied.
    // -------------------------------------------------------------------------
    let loaded = load_service_config();

    // Logging depends on configuration, so configuration errors are printed
    // through a default subscriber.
    let logging = loaded
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    init_logging(&logging);

    let service_config = match loaded {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration; aborting");
            std::process::exit(3);
        }
    };

    if let Err(e) = service_config.validate() {
        error!(error = %e, "Service configuration is invalid; aborting");
        std::process::exit(3);
    }

    info!("Starting Form Relay Service");

    let relay = match build_relay(&service_config) {
        Ok(relay) => relay,
        Err(e) => {
            error!(error = %e, "Failed to build submission relay; aborting");
            std::process::exit(exit_code(&e));
        }
    };

    info!(
        host = %service_config.server.host,
        port = service_config.server.port,
        endpoint = %service_config.webhook.endpoint_path,
        routed_categories = relay.routing().len(),
        "Starting HTTP server"
    );

    if let Err(e) = start_server(service_config, Arc::new(relay)).await {
        error!("Server terminated: {}", e);
        std::process::exit(exit_code(&e));
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level.
fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = if logging.json_format {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

/// Merge all configuration sources into a [`ServiceConfig`].
fn load_service_config() -> Result<ServiceConfig, config::ConfigError> {
    let mut builder = config::Config::builder()
        .add_source(
            config::File::with_name("/etc/form-relay/service")
                .required(false)
                .format(config::FileFormat::Yaml),
        )
        .add_source(
            config::File::with_name("config/service")
                .required(false)
                .format(config::FileFormat::Yaml),
        );

    if let Ok(explicit_path) = std::env::var(CONFIG_FILE_ENV) {
        if !explicit_path.is_empty() {
            builder = builder.add_source(
                config::File::with_name(&explicit_path)
                    .required(true)
                    .format(config::FileFormat::Yaml),
            );
        }
    }

    builder
        .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?
        .try_deserialize()
}

/// Wire normalizer, routing table, composer and Telegram client.
fn build_relay(config: &ServiceConfig) -> Result<SubmissionRelay, ServiceError> {
    let routing = config.routing_table()?;
    let delivery = TelegramClient::new(&config.telegram)?;

    Ok(SubmissionRelay::new(
        config.normalizer(),
        routing,
        config.composer(),
        Arc::new(delivery),
    ))
}

fn exit_code(error: &ServiceError) -> i32 {
    match error {
        ServiceError::BindFailed { .. } => 1,
        ServiceError::ServerFailed { .. } => 2,
        ServiceError::Configuration(_) => 3,
        ServiceError::Metrics(_) => 4,
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
