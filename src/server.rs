//! Manual-trigger HTTP endpoint.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/bulk-index` | Force a full re-index of all content |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! `POST /bulk-index` takes no body and returns `200` with an empty body
//! once the run completes. A failed run surfaces as a `500` JSON error
//! envelope:
//!
//! ```json
//! { "error": { "code": "index_error", "message": "..." } }
//! ```

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::indexer::GleanIndexer;

#[derive(Clone)]
struct AppState {
    indexer: Arc<GleanIndexer>,
}

/// Builds the connector's router; exposed separately for tests.
pub fn router(indexer: Arc<GleanIndexer>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/bulk-index", post(handle_bulk_index))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { indexer })
}

/// Binds the configured address and serves until the process terminates.
pub async fn run_server(bind: &str, indexer: Arc<GleanIndexer>) -> anyhow::Result<()> {
    let app = router(indexer);
    info!("listening on http://{bind}");

    let listener = tokio::net::TcpListener::bind(bind).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

// ============ POST /bulk-index ============

async fn handle_bulk_index(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.indexer.bulk_index().await.map_err(|err| {
        error!("bulk index run failed: {err:#}");
        AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "index_error".to_string(),
            message: format!("{err:#}"),
        }
    })?;
    Ok(StatusCode::OK)
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
