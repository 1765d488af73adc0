//! HTTP server exposing the dashboard view.
//!
//! This module provides an HTTP server that:
//! - Loads the observations on every GET /dashboard
//! - Runs the forecast pipeline against artifacts loaded at startup
//! - Returns the dashboard view as JSON
//!
//! # Architecture
//!
//! ```text
//! Browser ──→ GET /dashboard ──→ alertair ──→ DataSource
//!                                   ↓
//!                         [Window → Scale → Predict → Classify]
//! ```

use crate::config::Config;
use crate::core::error::ForecastError;
use crate::core::pipeline::{ForecastArtifacts, Forecaster};
use crate::dashboard::{DashboardBuilder, DashboardView};
use crate::source::{self, DataSource, SourceError};
use crate::tally::{create_shared_tally, SharedRenderTally, TallyStats};
use axum::{
    extract::State,
    http::{HeaderValue, Method, StatusCode},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
    /// Pipeline configuration
    pub config: Config,
}

impl ServerConfig {
    pub fn new(port: u16, config: Config) -> Self {
        Self { port, config }
    }
}

/// Shared server state
pub struct ServerState {
    forecaster: Forecaster,
    source: Box<dyn DataSource>,
    builder: DashboardBuilder,
    tally: SharedRenderTally,
}

impl ServerState {
    /// Load the artifacts and set up the source.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        config.validate()?;
        let artifacts = ForecastArtifacts::load(&config.model_path, &config.scaler_path)?;
        let forecaster = Forecaster::new(
            Arc::new(artifacts),
            config.alert.clone(),
            config.feature_columns.clone(),
            config.horizon_hours,
        );

        Ok(Self {
            forecaster,
            source: source::from_config(config)?,
            builder: DashboardBuilder::new(config)?,
            tally: create_shared_tally(),
        })
    }

    /// One full render: load, forecast, assemble.
    fn render(&self) -> Result<DashboardView, RenderError> {
        let table = self.source.load().map_err(RenderError::Source)?;
        let forecast = self
            .forecaster
            .forecast(&table)
            .map_err(RenderError::Forecast)?;
        Ok(self.builder.build(&table, &forecast))
    }
}

/// Why a render produced no view.
#[derive(Debug)]
enum RenderError {
    Source(SourceError),
    Forecast(ForecastError),
}

impl RenderError {
    fn status(&self) -> StatusCode {
        match self {
            RenderError::Source(_) => StatusCode::SERVICE_UNAVAILABLE,
            RenderError::Forecast(e) if e.is_data_error() => StatusCode::UNPROCESSABLE_ENTITY,
            RenderError::Forecast(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn into_response(self) -> (StatusCode, Json<ErrorResponse>) {
        let status = self.status();
        let (error, code) = match self {
            RenderError::Source(e) => (e.to_string(), "SOURCE_ERROR"),
            RenderError::Forecast(e) => (e.to_string(), e.code()),
        };
        (
            status,
            Json(ErrorResponse {
                error,
                code: code.to_string(),
            }),
        )
    }
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /dashboard
///
/// Reads the source and runs the pipeline on a blocking thread.
async fn dashboard(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<DashboardView>, (StatusCode, Json<ErrorResponse>)> {
    let worker = Arc::clone(&state);
    let result = tokio::task::spawn_blocking(move || worker.render())
        .await
        .map_err(|e| {
            tracing::error!("Render task failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Render task failed: {e}"),
                    code: "INTERNAL_ERROR".to_string(),
                }),
            )
        })?;

    match result {
        Ok(view) => {
            state.tally.record_level(view.alert.level);
            Ok(Json(view))
        }
        Err(e) => {
            state.tally.record_failure();
            tracing::warn!(error = ?e, "Dashboard render failed");
            Err(e.into_response())
        }
    }
}

/// GET /stats
async fn stats(State(state): State<Arc<ServerState>>) -> Json<TallyStats> {
    Json(state.tally.stats())
}

/// Run the HTTP server
pub async fn run(
    config: ServerConfig,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let state = Arc::new(ServerState::new(&config.config)?);

    let app = Router::new()
        .route("/health", get(health))
        .route("/dashboard", get(dashboard))
        .route("/stats", get(stats))
        .layer(
            CorsLayer::new()
                .allow_origin([
                    HeaderValue::from_static("http://localhost"),
                    HeaderValue::from_static("http://127.0.0.1"),
                ])
                .allow_methods([Method::GET])
                .allow_headers(Any),
        )
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Dashboard server listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}
