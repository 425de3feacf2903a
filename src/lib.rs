//! QuickCopy: canned response templates grouped by category, with
//! substring search and one-click copy.
//!
//! The core is the [`store::TemplateStore`] (validated, persisted
//! category → messages mapping) and the [`query`] engine. Surfaces built on
//! top: the coordinator ([`messaging`]) exposed over a local HTTP API
//! ([`http`]), the native messaging bridge and the CLI.

pub mod cli;
pub mod clipboard;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod messaging;
pub mod native_messaging;
pub mod query;
pub mod state;
pub mod storage;
pub mod store;
pub mod templates;
pub mod validate;

pub use error::{Result, StoreError};
pub use state::AppState;
pub use store::TemplateStore;
pub use templates::TemplateSet;
pub use validate::validate;
