//! Local HTTP API: the coordinator endpoint plus REST routes over the
//! template store and query engine.

mod message_routes;
mod template_routes;
mod types;

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::port_file_path;
use crate::error::StoreError;
use crate::state::AppState;

pub(crate) type ApiError = (StatusCode, Json<Value>);
pub(crate) type ApiResult<T> = Result<T, ApiError>;

/// HTTP status for a store error.
pub fn error_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::Validation(_) | StoreError::EmptyText(_) | StoreError::Parse(_) => {
            StatusCode::BAD_REQUEST
        }
        StoreError::NotFound(_) | StoreError::Index { .. } => StatusCode::NOT_FOUND,
        StoreError::DuplicateCategory(_) => StatusCode::CONFLICT,
        StoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn store_error(err: StoreError) -> ApiError {
    let status = error_status(&err);
    if status.is_server_error() {
        tracing::error!("store operation failed: {err}");
    } else {
        tracing::debug!("store operation rejected: {err}");
    }
    (status, Json(json!({"error": err.to_string(), "kind": err.kind()})))
}

/// Only localhost may modify state over HTTP.
pub(crate) fn require_loopback(addr: &SocketAddr, what: &str) -> ApiResult<()> {
    if addr.ip().is_loopback() {
        return Ok(());
    }
    tracing::warn!(peer = %addr, "{what} refused for non-loopback peer");
    Err((
        StatusCode::FORBIDDEN,
        Json(json!({"error": format!("{what} is only allowed from localhost")})),
    ))
}

/// Browser origins allowed to call the API: local pages and extension pages.
fn origin_allowed(origin: &HeaderValue) -> bool {
    let Ok(origin) = origin.to_str() else {
        return false;
    };
    if origin.starts_with("chrome-extension://") || origin.starts_with("moz-extension://") {
        return true;
    }
    ["http://localhost", "http://127.0.0.1"].iter().any(|base| {
        origin
            .strip_prefix(base)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(':'))
    })
}

/// Build the router (exposed for testing).
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|origin, _| origin_allowed(origin)))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        // Health
        .route("/health", get(message_routes::health))
        // Coordinator
        .route("/message", post(message_routes::post_message))
        .route("/clipboard", post(message_routes::post_clipboard))
        // Whole-set access
        .route(
            "/templates",
            get(template_routes::get_templates).put(template_routes::put_templates),
        )
        .route("/templates/stats", get(template_routes::get_stats))
        .route("/search", get(template_routes::search))
        // Categories
        .route("/categories", post(template_routes::add_category))
        .route(
            "/categories/{name}",
            put(template_routes::rename_category).delete(template_routes::delete_category),
        )
        // Messages
        .route(
            "/categories/{name}/messages",
            get(template_routes::list_messages).post(template_routes::add_message),
        )
        .route(
            "/categories/{name}/messages/{index}",
            put(template_routes::edit_message).delete(template_routes::delete_message),
        )
        .with_state(state)
        .layer(cors)
}

/// Start the HTTP API on 127.0.0.1 at the configured port (OS-assigned when
/// 0 or when the configured port is taken). The bound port is written to the
/// port file for the native messaging host and removed again on shutdown.
/// Runs until `AppState::server_shutdown` fires.
pub async fn start_server(state: Arc<AppState>) -> anyhow::Result<()> {
    let port = state.config.read().port;
    let bind_addr = format!("127.0.0.1:{port}");

    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(l) => l,
        Err(e) if port != 0 => {
            tracing::warn!("failed to bind {bind_addr}: {e}; falling back to an OS-assigned port");
            tokio::net::TcpListener::bind("127.0.0.1:0").await?
        }
        Err(e) => return Err(anyhow::anyhow!("failed to bind {bind_addr}: {e}")),
    };
    let addr = listener.local_addr()?;

    // Register before advertising the port so a caller that sees the port
    // file can always shut the server down.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    *state.server_shutdown.lock() = Some(shutdown_tx);

    let port_file = port_file_path();
    if let Some(parent) = port_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if let Err(e) = std::fs::write(&port_file, addr.port().to_string()) {
        tracing::error!("failed to write port file {}: {e}", port_file.display());
    }
    tracing::info!("QuickCopy API listening on http://{addr}");

    let app = build_router(state);
    let result = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
        })
        .await;

    let _ = std::fs::remove_file(&port_file);
    tracing::info!("QuickCopy API stopped");
    result.map_err(Into::into)
}

/// Ask a running server to shut down. Returns false when none is running.
pub fn stop_server(state: &AppState) -> bool {
    match state.server_shutdown.lock().take() {
        Some(tx) => tx.send(()).is_ok(),
        None => false,
    }
}
