use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;

use super::types::*;
use super::{require_loopback, ApiResult};
use crate::messaging::{self, Response};
use crate::state::AppState;

pub(super) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true, version: env!("CARGO_PKG_VERSION") })
}

/// Coordinator endpoint: one messaging request in, one response out.
/// Failures are reported in the body, so the status is always 200.
pub(super) async fn post_message(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(request): Json<Value>,
) -> ApiResult<Json<Response>> {
    require_loopback(&addr, "Messaging")?;
    Ok(Json(messaging::handle_value(&state, request).await))
}

pub(super) async fn post_clipboard(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<ClipboardRequest>,
) -> ApiResult<Json<Value>> {
    require_loopback(&addr, "Clipboard access")?;
    match state.clipboard.write_text(&req.text) {
        Ok(()) => Ok(Json(json!({"ok": true}))),
        Err(e) => {
            tracing::warn!("clipboard write failed: {e}");
            Err((StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": e.to_string()}))))
        }
    }
}
