//! HTTP server exposing the answering pipeline.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/ask` | Answer a question from the indexed manuals |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! `POST /ask` takes `{ "query": "..." }` and returns `{ "response": "..." }`
//! on success. A missing or empty query, or an unparseable body, yields
//! `400 { "error": "..." }`;
//! any pipeline failure yields `500 { "error": "..." }`. Per-request errors
//! are always returned as a response object and never crash the process.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser-based case
//! tools can call the API cross-origin.

use axum::{
    extract::rejection::JsonRejection,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::error::CasebookError;
use crate::service::QueryService;

/// Start the server: open the index, construct the model backends once,
/// and serve until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let service = Arc::new(QueryService::open(config).await?);
    println!("index loaded: {} chunks", service.index_len().await?);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router(service).layer(cors);

    let bind_addr = &config.server.bind;
    println!("casebook server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Routes without middleware, shared with in-process tests.
pub fn router(service: Arc<QueryService>) -> Router {
    Router::new()
        .route("/ask", post(handle_ask))
        .route("/health", get(handle_health))
        .with_state(service)
}

#[derive(Serialize)]
struct AskResponse {
    response: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

struct AppError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<CasebookError> for AppError {
    fn from(e: CasebookError) -> Self {
        let status = match e {
            CasebookError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        AppError {
            status,
            message: e.to_string(),
        }
    }
}

async fn handle_ask(
    State(service): State<Arc<QueryService>>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<AskResponse>, AppError> {
    // An unparseable body gets the same error shape as every other failure.
    let Json(params) = body.map_err(|rejection| AppError {
        status: StatusCode::BAD_REQUEST,
        message: rejection.body_text(),
    })?;
    // Absent and empty queries are rejected alike by the service.
    let query = params.get("query").and_then(|v| v.as_str()).unwrap_or("");
    let response = service.answer(query).await?;
    Ok(Json(AskResponse { response }))
}

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
