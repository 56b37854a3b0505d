//! # Form Relay HTTP Service
//!
//! HTTP server receiving form-service webhooks and relaying them to a chat.
//!
//! This service provides:
//! - Form submission webhook endpoint (JSON or URL-encoded bodies)
//! - Health check endpoint
//! - Prometheus metrics endpoint

pub mod config;
pub mod errors;
pub mod metrics;
pub mod responses;
pub mod telegram;

pub use config::{
    BotToken, LoggingConfig, RoutingConfig, ServerConfig, ServiceConfig, TelegramConfig,
    WebhookConfig,
};
pub use errors::{ConfigError, ServiceError, WebhookHandlerError};
pub use metrics::ServiceMetrics;
pub use responses::{HealthResponse, WebhookResponse};
pub use telegram::TelegramClient;

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use form_relay_core::{BodyEncoding, SubmissionRelay};
use std::{any::Any, net::SocketAddr, sync::Arc};
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{error, info, instrument, warn};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration for the service
    pub config: Arc<ServiceConfig>,

    /// Normalize → compose → deliver pipeline
    pub relay: Arc<SubmissionRelay>,

    /// Metrics collector for observability
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        config: ServiceConfig,
        relay: Arc<SubmissionRelay>,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            relay,
            metrics,
        }
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Create HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let webhook_routes = Router::new()
        .route(&state.config.webhook.endpoint_path, post(handle_webhook))
        .layer(DefaultBodyLimit::max(state.config.server.max_body_size));

    let health_routes = Router::new()
        .route("/", get(handle_status))
        .route("/health", get(handle_health_check));

    let observability_routes = Router::new().route("/metrics", get(metrics_endpoint));

    Router::new()
        .merge(webhook_routes)
        .merge(health_routes)
        .merge(observability_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(middleware::from_fn(request_logging_middleware))
                .into_inner(),
        )
        .with_state(state)
}

/// Start HTTP server
pub async fn start_server(
    config: ServiceConfig,
    relay: Arc<SubmissionRelay>,
) -> Result<(), ServiceError> {
    let metrics = ServiceMetrics::new()?;

    let address = format!("{}:{}", config.server.host, config.server.port);
    let addr: SocketAddr = address.parse().map_err(|e| {
        ServiceError::Configuration(ConfigError::Invalid {
            message: format!("server address '{}': {}", address, e),
        })
    })?;

    let state = AppState::new(config, relay, metrics);
    let app = create_router(state);

    let listener =
        tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServiceError::BindFailed {
                address: addr.to_string(),
                message: e.to_string(),
            })?;

    info!("Starting HTTP server on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServiceError::ServerFailed {
            message: e.to_string(),
        })?;

    info!("HTTP server shutdown complete");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
///
/// A signal handler that cannot be installed never resolves, leaving the
/// other one in charge.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C), shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

// ============================================================================
// Webhook Handlers
// ============================================================================

/// Handle form submission webhooks
///
/// 1. Decode the body as JSON or URL-encoded form, per `Content-Type`
/// 2. Normalize, route and compose the notification
/// 3. Send it to the chat API once
///
/// Decoding problems with an embedded raw request are not errors; the
/// top-level payload is used instead.
#[instrument(skip(state, headers, body))]
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, WebhookHandlerError> {
    state.metrics.submissions_received_total.inc();

    let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
    let encoding = BodyEncoding::from_content_type(content_type);

    info!(
        encoding = ?encoding,
        body_size = body.len(),
        "Received form submission"
    );

    let prepared = encoding
        .decode(&body)
        .and_then(|payload| state.relay.prepare(payload))
        .map_err(|e| {
            state.metrics.submissions_malformed_total.inc();
            WebhookHandlerError::from(e)
        })?;
    state.metrics.record_prepared(&prepared);

    let result = state.relay.deliver(prepared).await;
    state.metrics.record_delivery(&result);
    let outcome = result?;

    info!(
        category = ?outcome.category,
        topic_id = ?outcome.topic_id,
        message_id = ?outcome.message_id,
        "Submission relayed"
    );

    Ok(Json(WebhookResponse::from(outcome)))
}

// ============================================================================
// Health Check Handlers
// ============================================================================

/// Static status string
async fn handle_status() -> &'static str {
    "Form relay is running"
}

/// Basic health check endpoint
#[instrument]
async fn handle_health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

// ============================================================================
// Observability Handlers
// ============================================================================

/// Prometheus metrics endpoint
#[instrument(skip_all)]
async fn metrics_endpoint(State(state): State<AppState>) -> Result<String, StatusCode> {
    state.metrics.render().map_err(|e| {
        error!(error = %e, "Failed to encode metrics");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

// ============================================================================
// Middleware
// ============================================================================

/// Convert a handler panic into the structured 500 response.
fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    WebhookHandlerError::InternalError { message }.into_response()
}

/// Request logging middleware with correlation ID tracking
///
/// Uses the caller's `x-correlation-id` header when present, otherwise
/// generates one, and echoes it on the response.
#[instrument(skip(request, next), fields(
    method = %request.method(),
    uri = %request.uri(),
    correlation_id
))]
async fn request_logging_middleware(
    mut request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let correlation_id = request
        .headers()
        .get("x-correlation-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    tracing::Span::current().record("correlation_id", correlation_id.as_str());
    request.extensions_mut().insert(correlation_id.clone());

    let mut response = next.run(request).await;
    let duration = start.elapsed();

    if let Ok(header_value) = correlation_id.parse() {
        response
            .headers_mut()
            .insert("x-correlation-id", header_value);
    }

    let status = response.status();

    if status.is_server_error() {
        error!(
            correlation_id = %correlation_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with server error"
        );
    } else if status.is_client_error() {
        warn!(
            correlation_id = %correlation_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with client error"
        );
    } else {
        info!(
            correlation_id = %correlation_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed successfully"
        );
    }

    response
}
