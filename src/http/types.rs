use serde::{Deserialize, Serialize};

// --- Request/Response types ---

#[derive(Serialize)]
pub(super) struct HealthResponse {
    pub ok: bool,
    pub version: &'static str,
}

#[derive(Deserialize)]
pub(super) struct SearchQuery {
    #[serde(default)]
    pub q: String,
    /// Include highlighted markup next to each message.
    #[serde(default)]
    pub highlight: bool,
}

#[derive(Serialize)]
pub(super) struct HighlightedMessage {
    pub text: String,
    pub html: String,
}

#[derive(Serialize)]
pub(super) struct HighlightedCategory {
    pub category: String,
    pub key: String,
    pub messages: Vec<HighlightedMessage>,
}

#[derive(Deserialize)]
pub(super) struct CategoryFilterQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Serialize)]
pub(super) struct IndexedMessage {
    pub index: usize,
    pub text: String,
}

#[derive(Deserialize)]
pub(super) struct CategoryRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub(super) struct MessageRequest {
    pub text: String,
}

#[derive(Deserialize)]
pub(super) struct ClipboardRequest {
    pub text: String,
}
