//! Request/response contract between UI surfaces and the background
//! coordinator.
//!
//! Requests are JSON objects tagged by `action`:
//! `{"action": "getMessageData"}`, `{"action": "saveMessageData", "data": {...}}`
//! and `{"action": "copyToClipboard", "text": "..."}`. Every request gets a
//! `{"success": bool, "data"?: ..., "error"?: "..."}` response.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::AppState;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    GetMessageData,
    SaveMessageData { data: Value },
    CopyToClipboard { text: String },
}

impl Request {
    /// Parse an untyped request, naming the action when it is unknown.
    pub fn from_value(value: Value) -> Result<Self, String> {
        let action = value
            .get("action")
            .and_then(Value::as_str)
            .map(str::to_string);
        serde_json::from_value(value).map_err(|e| match action {
            Some(action) => format!("Invalid request for action \"{action}\": {e}"),
            None => "Request is missing an \"action\" field".to_string(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn ok() -> Self {
        Self { success: true, data: None, error: None }
    }

    pub fn with_data(data: Value) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(error.into()) }
    }
}

/// Handle one request against the shared state.
pub async fn handle(state: &AppState, request: Request) -> Response {
    match request {
        Request::GetMessageData => {
            let store = state.store.lock().await;
            match store.raw().await {
                // `null` when nothing has been stored yet
                Ok(value) => Response::with_data(value.unwrap_or(Value::Null)),
                Err(e) => Response::err(e.to_string()),
            }
        }
        Request::SaveMessageData { data } => {
            let mut store = state.store.lock().await;
            match store.save_value(&data).await {
                Ok(()) => Response::ok(),
                Err(e) => {
                    tracing::warn!("saveMessageData rejected: {e}");
                    Response::err(e.to_string())
                }
            }
        }
        Request::CopyToClipboard { text } => match state.clipboard.write_text(&text) {
            Ok(()) => {
                tracing::debug!(chars = text.chars().count(), "copied to clipboard");
                Response::ok()
            }
            Err(e) => {
                tracing::warn!("copyToClipboard failed: {e}");
                Response::err(e.to_string())
            }
        },
    }
}

/// Parse and handle an untyped request; malformed requests become error
/// responses.
pub async fn handle_value(state: &AppState, value: Value) -> Response {
    match Request::from_value(value) {
        Ok(request) => handle(state, request).await,
        Err(e) => Response::err(e),
    }
}
