//! REST front end.
//!
//! Serves the manifest and every registered domain as JSON over HTTP, and
//! mounts the MCP streamable HTTP endpoint on the same listener.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Health probe: status, service name, version, type |
//! | `GET`  | `/manifest` | The service manifest |
//! | `GET`  | `/{domain}` | The domain's items, ordered by file name |
//! | `POST` | `/mcp` | MCP streamable HTTP (path set by `server.mcp_path`) |
//!
//! # Caller Role
//!
//! The role is read from the `role` query parameter, then the
//! `x-caller-role` header, then falls back to `gateway.default_role`.
//! A blank query value counts as absent.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "forbidden", "message": "role 'guest' may not read 'architecture': role is not permitted" } }
//! ```
//!
//! Error codes: `not_found` (404), `forbidden` (403). A domain that is
//! permitted but empty returns `200` with `[]`. When files were skipped
//! during loading, the `x-partial-failures` header carries their count and
//! `x-partial-failure-files` their names.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use knowledge_gateway_core::DomainLoad;

use crate::config::Config;
use crate::gateway::{Gateway, GatewayError};
use crate::mcp::McpBridge;

pub const CALLER_ROLE_HEADER: &str = "x-caller-role";
pub const PARTIAL_FAILURES_HEADER: &str = "x-partial-failures";
pub const PARTIAL_FAILURE_FILES_HEADER: &str = "x-partial-failure-files";

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    gateway: Gateway,
}

/// Builds the router: REST routes plus the MCP service at `server.mcp_path`.
pub fn router(gateway: Gateway, config: &Config) -> Router {
    let bridge = McpBridge::new(gateway.clone(), config);
    let mcp_service = StreamableHttpService::new(
        move || Ok(bridge.clone()),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig::default(),
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_health))
        .route("/manifest", get(handle_manifest))
        .route("/{domain}", get(handle_domain))
        .nest_service(&config.server.mcp_path, mcp_service)
        .layer(cors)
        .with_state(AppState { gateway })
}

/// Starts the HTTP server on `bind` and serves until the process exits.
pub async fn run_server(gateway: Gateway, config: &Config, bind: &str) -> anyhow::Result<()> {
    let app = router(gateway.clone(), config);

    for d in gateway.registry().domains() {
        info!(route = %format!("/{}", d.name), tool = %d.tool, "domain registered");
    }

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(
        addr = %listener.local_addr()?,
        mcp = %config.server.mcp_path,
        "knowledge gateway listening"
    );
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// Gateway error rendered as an HTTP response.
struct AppError {
    status: StatusCode,
    error: GatewayError,
}

impl From<GatewayError> for AppError {
    fn from(error: GatewayError) -> Self {
        let status = match error {
            GatewayError::Registry(_) => StatusCode::NOT_FOUND,
            GatewayError::Forbidden(_) => StatusCode::FORBIDDEN,
        };
        Self { status, error }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(self.error.body())).into_response()
    }
}

// ============ GET / ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    service: String,
    version: String,
    #[serde(rename = "type")]
    kind: String,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let manifest = state.gateway.manifest();
    Json(HealthResponse {
        status: "running".to_string(),
        service: manifest.name.clone(),
        version: manifest.version.clone(),
        kind: manifest.kind.clone(),
    })
}

// ============ GET /manifest ============

async fn handle_manifest(State(state): State<AppState>) -> Response {
    Json(state.gateway.manifest()).into_response()
}

// ============ GET /{domain} ============

#[derive(Debug, Default, Deserialize)]
struct RoleQuery {
    role: Option<String>,
}

/// Handler for `GET /{domain}`.
///
/// Returns `404` for an unregistered domain and `403` when the manifest
/// denies the caller's role.
async fn handle_domain(
    State(state): State<AppState>,
    Path(domain): Path<String>,
    Query(query): Query<RoleQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let role = query.role.filter(|r| !r.trim().is_empty()).or_else(|| {
        headers
            .get(CALLER_ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    });

    let request = state.gateway.request(&domain, role.as_deref());
    let load = state.gateway.read_domain(&request).await?;
    Ok(domain_response(load))
}

fn domain_response(load: DomainLoad) -> Response {
    let skipped = load.diagnostics.len();
    let mut response = Json(&load.items).into_response();
    if skipped > 0 {
        let headers = response.headers_mut();
        headers.insert(PARTIAL_FAILURES_HEADER, HeaderValue::from(skipped));
        let files: Vec<&str> = load.diagnostics.iter().map(|d| d.file.as_str()).collect();
        // Names that are not valid header text are only reported in the log.
        if let Ok(value) = HeaderValue::from_str(&files.join(", ")) {
            headers.insert(PARTIAL_FAILURE_FILES_HEADER, value);
        }
    }
    response
}
