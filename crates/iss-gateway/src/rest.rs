//! HTTP REST API for the gateway.
//!
//! Serves the generated SDL, a listing of query fields, and a query
//! endpoint that proxies reads to ISS.

use crate::client::IssClient;
use crate::config::ReferenceSource;
use crate::error::GatewayError;
use crate::executor;
use crate::schema::{render_sdl, QuerySchema};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};

/// State shared by all handlers.
pub struct GatewayState {
    pub schema: Arc<QuerySchema>,
    pub client: IssClient,
    pub references: Vec<ReferenceSource>,
    pub started_at: Instant,
}

impl GatewayState {
    pub fn new(schema: QuerySchema, client: IssClient, references: Vec<ReferenceSource>) -> Self {
        Self {
            schema: Arc::new(schema),
            client,
            references,
            started_at: Instant::now(),
        }
    }
}

/// Build the axum Router with all REST endpoints.
pub fn router(state: Arc<GatewayState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/schema.graphql", get(handle_sdl))
        .route("/api/v1/fields", get(handle_fields))
        .route("/api/v1/references", get(handle_references))
        .route("/api/v1/query", post(handle_query))
        .layer(cors)
        .with_state(state)
}

/// Serve the REST API on `addr` until ctrl-c.
pub async fn start(addr: &str, state: Arc<GatewayState>) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("REST API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("received shutdown signal");
        })
        .await?;
    Ok(())
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.to_json())).into_response()
    }
}

// ── Handlers ────────────────────────────────────────────────────

async fn health(State(state): State<Arc<GatewayState>>) -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": state.started_at.elapsed().as_secs_f64(),
        "fields": state.schema.fields.len(),
        "skipped": state.schema.skipped,
    }))
}

async fn handle_sdl(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        render_sdl(&state.schema),
    )
}

async fn handle_fields(State(state): State<Arc<GatewayState>>) -> Json<Value> {
    let fields: Vec<Value> = state
        .schema
        .fields
        .iter()
        .map(|f| {
            serde_json::json!({
                "name": f.name,
                "description": f.description,
                "reference": f.reference_id,
                "block": f.block,
                "path": f.path,
                "path_args": f.path_args,
                "args": f.args,
                "type": f.row_type,
            })
        })
        .collect();
    Json(serde_json::json!({ "fields": fields }))
}

async fn handle_references(State(state): State<Arc<GatewayState>>) -> Json<Value> {
    Json(serde_json::json!({
        "references": state.references,
        "skipped": state.schema.skipped,
    }))
}

/// Body of `POST /api/v1/query`.
#[derive(Debug, Deserialize)]
struct QueryRequest {
    field: String,
    #[serde(default)]
    args: Map<String, Value>,
}

async fn handle_query(
    State(state): State<Arc<GatewayState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, GatewayError> {
    let Json(raw) = payload.map_err(|e| GatewayError::InvalidBody(e.body_text()))?;
    let body: QueryRequest = serde_json::from_value(raw)?;
    let rows = executor::execute(&state.schema, &state.client, &body.field, &body.args)
        .await
        .inspect_err(|e| tracing::warn!(field = %body.field, "query failed: {e}"))?;
    Ok(Json(serde_json::json!({ "data": rows })))
}
