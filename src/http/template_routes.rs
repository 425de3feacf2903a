use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;

use super::types::*;
use super::{require_loopback, store_error, ApiResult};
use crate::error::StoreError;
use crate::query;
use crate::state::AppState;
use crate::validate::parse_template_json;

pub(super) async fn get_templates(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let mut store = state.store.lock().await;
    let set = store.load().await.map_err(store_error)?;
    Ok(Json(set.to_value()))
}

/// Replace the whole set. The body is parsed as template JSON so syntax
/// problems and shape problems are reported separately.
pub(super) async fn put_templates(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    body: String,
) -> ApiResult<Json<Value>> {
    require_loopback(&addr, "Template modification")?;
    let set = parse_template_json(&body).map_err(store_error)?;
    let stats = set.stats();
    state.store.lock().await.save(set).await.map_err(store_error)?;
    Ok(Json(json!({"ok": true, "stats": stats})))
}

pub(super) async fn get_stats(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let mut store = state.store.lock().await;
    let set = store.load().await.map_err(store_error)?;
    Ok(Json(json!(set.stats())))
}

pub(super) async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> ApiResult<Json<Value>> {
    let mut store = state.store.lock().await;
    let set = store.load().await.map_err(store_error)?;
    let results = query::search(set, &params.q);
    if !params.highlight {
        return Ok(Json(json!(results)));
    }
    let highlighted: Vec<HighlightedCategory> = results
        .into_iter()
        .map(|group| HighlightedCategory {
            messages: group
                .messages
                .into_iter()
                .map(|text| HighlightedMessage {
                    html: query::highlight(&text, &params.q),
                    text,
                })
                .collect(),
            category: group.category,
            key: group.key,
        })
        .collect();
    Ok(Json(json!(highlighted)))
}

pub(super) async fn add_category(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<CategoryRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    require_loopback(&addr, "Template modification")?;
    let mut store = state.store.lock().await;
    store.add_category(&req.name).await.map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(json!({"ok": true}))))
}

pub(super) async fn rename_category(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(name): Path<String>,
    Json(req): Json<CategoryRequest>,
) -> ApiResult<Json<Value>> {
    require_loopback(&addr, "Template modification")?;
    let mut store = state.store.lock().await;
    store.rename_category(&name, &req.name).await.map_err(store_error)?;
    Ok(Json(json!({"ok": true})))
}

pub(super) async fn delete_category(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(name): Path<String>,
) -> ApiResult<Json<Value>> {
    require_loopback(&addr, "Template modification")?;
    let mut store = state.store.lock().await;
    store.delete_category(&name).await.map_err(store_error)?;
    Ok(Json(json!({"ok": true})))
}

/// Messages of one category with their indices, optionally filtered by `q`.
pub(super) async fn list_messages(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(params): Query<CategoryFilterQuery>,
) -> ApiResult<Json<Vec<IndexedMessage>>> {
    let mut store = state.store.lock().await;
    let set = store.load().await.map_err(store_error)?;
    let hits = query::search_category(set, &name, &params.q)
        .ok_or_else(|| store_error(StoreError::NotFound(name.clone())))?;
    Ok(Json(
        hits.into_iter()
            .map(|(index, text)| IndexedMessage { index, text: text.to_string() })
            .collect(),
    ))
}

pub(super) async fn add_message(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(name): Path<String>,
    Json(req): Json<MessageRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    require_loopback(&addr, "Template modification")?;
    let mut store = state.store.lock().await;
    store.add_message(&name, &req.text).await.map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(json!({"ok": true}))))
}

pub(super) async fn edit_message(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path((name, index)): Path<(String, usize)>,
    Json(req): Json<MessageRequest>,
) -> ApiResult<Json<Value>> {
    require_loopback(&addr, "Template modification")?;
    let mut store = state.store.lock().await;
    store.edit_message(&name, index, &req.text).await.map_err(store_error)?;
    Ok(Json(json!({"ok": true})))
}

pub(super) async fn delete_message(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path((name, index)): Path<(String, usize)>,
) -> ApiResult<Json<Value>> {
    require_loopback(&addr, "Template modification")?;
    let mut store = state.store.lock().await;
    let removed = store.delete_message(&name, index).await.map_err(store_error)?;
    Ok(Json(json!({"ok": true, "removed": removed})))
}
