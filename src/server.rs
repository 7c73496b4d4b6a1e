//! Noteless HTTP server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/intake` | Submit a snap (`{"Image": "<base64>"}`), returns `{"Message": "..."}` |
//! | `GET`  | `/rules` | Command rule text (`text/plain`) |
//! | `GET`  | `/notes` | Stored note images as PNG data URIs |
//! | `GET`  | `/commands` | Commands found across all notes |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! Every failure is reported as HTTP 500 with the error message as a
//! plain-text body. The error class is logged with its code
//! (`decode_error`, `ocr_error`, `storage_error`, `extraction_error`).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the notes page can be
//! served from anywhere.

use std::future::Future;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use noteless_core::models::{IntakeResponse, NoteThumbnail};
use noteless_core::NoteError;

use crate::config::Config;
use crate::intake::IntakePipeline;
use crate::listing::ListingService;
use crate::services::Services;

/// Largest accepted intake body. Snaps arrive base64-encoded inside JSON.
const MAX_INTAKE_BODY: usize = 16 * 1024 * 1024;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    intake: Arc<IntakePipeline>,
    listing: Arc<ListingService>,
}

/// Starts the server on `[server].bind` and runs it until SIGINT or SIGTERM.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let services = Services::from_config(config).await?;
    let listener = TcpListener::bind(&config.server.bind).await?;
    info!(bind = %config.server.bind, "noteless listening");
    serve(listener, services, shutdown_signal()).await
}

/// Serves the API on an already-bound listener until `shutdown` resolves.
///
/// In-flight requests are allowed to finish before this returns.
pub async fn serve<F>(listener: TcpListener, services: Services, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(&services))
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("server stopped");
    Ok(())
}

/// Builds the route table.
pub fn router(services: &Services) -> Router {
    let state = AppState {
        intake: Arc::new(services.intake()),
        listing: Arc::new(services.listing()),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/intake", post(handle_intake))
        .route("/rules", get(handle_rules))
        .route("/notes", get(handle_notes))
        .route("/commands", get(handle_commands))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(MAX_INTAKE_BODY))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Resolves on Ctrl-C, or on SIGTERM where supported.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

// ============ Error response ============

/// Wraps a [`NoteError`] so it converts into an Axum HTTP response.
struct AppError(NoteError);

impl From<NoteError> for AppError {
    fn from(err: NoteError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!(code = self.0.code(), error = %self.0, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.0.to_string(),
        )
            .into_response()
    }
}

// ============ POST /intake ============

async fn handle_intake(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<IntakeResponse>, AppError> {
    let body = std::str::from_utf8(&body).map_err(|e| NoteError::Decode(e.to_string()))?;
    let outcome = state.intake.intake_json(body).await?;
    Ok(Json(outcome.to_response()))
}

// ============ GET /rules ============

async fn handle_rules(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.listing.rules_text(),
    )
}

// ============ GET /notes ============

async fn handle_notes(
    State(state): State<AppState>,
) -> Result<Json<Vec<NoteThumbnail>>, AppError> {
    Ok(Json(state.listing.list_note_thumbnails().await?))
}

// ============ GET /commands ============

async fn handle_commands(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    let commands = state.listing.list_commands().await?;
    Ok(Json(commands.into_iter().collect()))
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    /// The crate version from `Cargo.toml`.
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
