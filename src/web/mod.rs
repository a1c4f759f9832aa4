// Web server: Axum JSON API over the model registry.
//
// Three POST endpoints do the work (/tags/generate, /cards/cluster,
// /agent/invoke) and GET /health reports which models are loaded. There is
// no auth and no persistence: every request carries all the data it needs.

use std::sync::Arc;

use anyhow::Result;
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::agent::report::AgentError;
use crate::cluster::engine::ClusterError;
use crate::registry::ModelRegistry;

pub mod handlers;

/// Shared application state threaded through all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ModelRegistry>,
}

/// Request failure, rendered as `{"detail": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A model the endpoint needs was never configured.
    #[error("{0} is not configured on this server")]
    Unavailable(&'static str),

    #[error("{0}")]
    Internal(String),
}

impl From<ClusterError> for ApiError {
    fn from(e: ClusterError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<AgentError> for ApiError {
    fn from(e: AgentError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(message) => {
                error!(error = %message, "Request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (
            status,
            Json(serde_json::json!({ "detail": self.to_string() })),
        )
            .into_response()
    }
}

/// Start the Axum web server and block until it exits.
pub async fn run_server(registry: ModelRegistry, port: u16, bind: &str) -> Result<()> {
    let state = AppState {
        registry: Arc::new(registry),
    };

    let app = build_router(state);

    let addr = format!("{bind}:{port}");
    info!("cardlens listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tags/generate", post(handlers::tags::generate_tags))
        .route("/cards/cluster", post(handlers::cluster::cluster_cards))
        .route("/agent/invoke", post(handlers::agent::invoke_agent))
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Always 200; the body says which models are usable.
async fn health(axum::extract::State(state): axum::extract::State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "models": state.registry.availability(),
        })),
    )
}
