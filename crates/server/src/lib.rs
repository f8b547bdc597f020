//! HTTP conversion endpoint for imgconv
//!
//! One route does the work: `POST /api/convert` takes a multipart body with a
//! `file` and a `format` field and answers with the converted bytes, or with a
//! JSON error whose status and message are fixed per failure kind.
//!
//! The endpoint holds no per-request state. Everything a request needs is in
//! [`AppState`], which is immutable after startup and shared by reference.
//!
//! # Example
//!
//! ```rust,no_run
//! use imgconv_server::{ServerConfig, serve};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::load(None)?;
//!     serve(config).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod handlers;

pub use config::{ConfigError, ServerConfig};
pub use error::{ConvertError, ErrorBody};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use imgconv_image::{FormatWhitelist, ImageConverter, StandardConverter};
use imgconv_telemetry::MetricsRegistry;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared, read-only state handed to every request
#[derive(Clone)]
pub struct AppState {
    pub converter: Arc<dyn ImageConverter>,
    pub whitelist: Arc<FormatWhitelist>,
    pub quality: u8,
    pub max_body_bytes: usize,
    pub metrics: Arc<MetricsRegistry>,
}

impl AppState {
    /// Build state from validated configuration, using the standard converter
    pub fn from_config(config: &ServerConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            converter: Arc::new(StandardConverter),
            whitelist: Arc::new(config.whitelist()?),
            quality: config.quality,
            max_body_bytes: config.max_body_bytes,
            metrics: Arc::new(MetricsRegistry::new()),
        })
    }

    /// Swap the image capability
    #[must_use]
    pub fn with_converter(mut self, converter: Arc<dyn ImageConverter>) -> Self {
        self.converter = converter;
        self
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let body_limit = state.max_body_bytes;

    Router::new()
        .route("/api/convert", post(handlers::convert))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until Ctrl-C
pub async fn serve(config: ServerConfig) -> std::io::Result<()> {
    let state = AppState::from_config(&config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    let listener = TcpListener::bind(config.bind).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        max_body_bytes = config.max_body_bytes,
        formats = ?config.formats,
        "Conversion endpoint listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
