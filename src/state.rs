use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

use crate::clipboard::{platform_clipboard, Clipboard};
use crate::config::AppConfig;
use crate::error::Result;
use crate::storage::JsonFileStore;
use crate::store::TemplateStore;

/// Shared state behind every surface: one template store instance, the
/// clipboard writer and the loaded config.
pub struct AppState {
    /// Serializes this process's mutations; each one re-reads the file, so
    /// edits made by other processes are kept.
    pub store: tokio::sync::Mutex<TemplateStore<JsonFileStore>>,
    pub clipboard: Box<dyn Clipboard>,
    pub config: RwLock<AppConfig>,
    /// Signals the running HTTP server to shut down.
    pub server_shutdown: Mutex<Option<tokio::sync::oneshot::Sender<()>>>,
}

impl AppState {
    pub fn new(config: AppConfig, clipboard: Box<dyn Clipboard>) -> Self {
        let backend = JsonFileStore::new(config.data_dir());
        let store = TemplateStore::with_key(backend, config.storage_key.clone());
        Self {
            store: tokio::sync::Mutex::new(store),
            clipboard,
            config: RwLock::new(config),
            server_shutdown: Mutex::new(None),
        }
    }

    /// State wired to the platform clipboard, honoring the config's
    /// fallback setting.
    pub fn from_config(config: AppConfig) -> Self {
        let clipboard = platform_clipboard(config.fallback_clipboard);
        Self::new(config, Box::new(clipboard))
    }

    /// Load (and on first run seed) the template set.
    pub async fn init(self: &Arc<Self>) -> Result<()> {
        let mut store = self.store.lock().await;
        let set = store.load().await?;
        tracing::info!(
            categories = set.len(),
            path = %store.backend().path_for(store.key()).display(),
            "template store ready"
        );
        Ok(())
    }
}
