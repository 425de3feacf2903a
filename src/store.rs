//! Template store: owns the in-memory [`TemplateSet`] and persists it whole
//! after every mutation.
//!
//! Mutations are applied to a copy of the set and only committed to memory
//! once the backend write succeeds, so a failed write leaves the in-memory
//! set equal to the last persisted state. Every mutation re-reads the
//! persisted set first, so writes from other processes sharing the backend
//! are built upon rather than overwritten.

use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::storage::KeyValueStore;
use crate::templates::{default_templates, TemplateSet};

/// Storage key holding the whole template set.
pub const DEFAULT_STORAGE_KEY: &str = "messageData";

pub struct TemplateStore<B> {
    backend: B,
    key: String,
    data: TemplateSet,
}

fn non_blank<'a>(text: &'a str, what: &'static str) -> Result<&'a str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(StoreError::EmptyText(what))
    } else {
        Ok(trimmed)
    }
}

impl<B: KeyValueStore> TemplateStore<B> {
    pub fn new(backend: B) -> Self {
        Self::with_key(backend, DEFAULT_STORAGE_KEY)
    }

    pub fn with_key(backend: B, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
            data: TemplateSet::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The in-memory set. Empty until [`load`](Self::load) has run.
    pub fn data(&self) -> &TemplateSet {
        &self.data
    }

    /// Read the persisted set, seeding and persisting the built-in defaults
    /// when nothing is stored yet.
    pub async fn load(&mut self) -> Result<&TemplateSet> {
        match self.backend.get(&self.key).await? {
            Some(value) => {
                let set: TemplateSet = serde_json::from_value(value).map_err(|e| {
                    StoreError::Storage(format!("Persisted template data is unreadable: {e}"))
                })?;
                tracing::debug!(categories = set.len(), "templates loaded");
                self.data = set;
            }
            None => {
                let defaults = default_templates();
                self.backend.set(&self.key, defaults.to_value()).await?;
                tracing::info!(categories = defaults.len(), "no templates stored, seeded defaults");
                self.data = defaults;
            }
        }
        Ok(&self.data)
    }

    /// Raw persisted value without seeding defaults.
    pub async fn raw(&self) -> Result<Option<Value>> {
        self.backend.get(&self.key).await
    }

    /// Re-read the persisted set before mutating it. Another process (the
    /// CLI next to a running server) may have written since our last read.
    async fn refresh(&mut self) -> Result<()> {
        self.load().await?;
        Ok(())
    }

    async fn commit(&mut self, next: TemplateSet) -> Result<()> {
        self.backend.set(&self.key, next.to_value()).await?;
        self.data = next;
        Ok(())
    }

    /// Replace the whole set. An empty set fails validation.
    pub async fn save(&mut self, next: TemplateSet) -> Result<()> {
        if next.is_empty() {
            return Err(StoreError::Validation(
                "at least one category is required".to_string(),
            ));
        }
        self.commit(next).await?;
        tracing::info!(categories = self.data.len(), "templates saved");
        Ok(())
    }

    /// Validate an untyped candidate and save it.
    pub async fn save_value(&mut self, candidate: &Value) -> Result<()> {
        let next = TemplateSet::try_from(candidate)?;
        self.save(next).await
    }

    pub async fn add_category(&mut self, name: &str) -> Result<()> {
        let name = non_blank(name, "Category name")?;
        self.refresh().await?;
        if self.data.contains(name) {
            return Err(StoreError::DuplicateCategory(name.to_string()));
        }
        let mut next = self.data.clone();
        next.insert(name, Vec::new());
        self.commit(next).await?;
        tracing::info!(category = name, "category added");
        Ok(())
    }

    /// Move `old`'s messages to `new`. The renamed category goes to the end
    /// of the key order; renaming to the same name is a plain re-save.
    pub async fn rename_category(&mut self, old: &str, new: &str) -> Result<()> {
        self.refresh().await?;
        if !self.data.contains(old) {
            return Err(StoreError::NotFound(old.to_string()));
        }
        let new = non_blank(new, "Category name")?;
        if new != old && self.data.contains(new) {
            return Err(StoreError::DuplicateCategory(new.to_string()));
        }

        let mut next = self.data.clone();
        if new != old {
            let messages = next.remove(old).unwrap_or_default();
            next.insert(new, messages);
        }
        self.commit(next).await?;
        tracing::info!(from = old, to = new, "category renamed");
        Ok(())
    }

    /// Delete a category with all its messages. Deleting an absent category
    /// still persists and succeeds.
    pub async fn delete_category(&mut self, name: &str) -> Result<()> {
        self.refresh().await?;
        let mut next = self.data.clone();
        let removed = next.remove(name);
        self.commit(next).await?;
        match removed {
            Some(messages) => {
                tracing::info!(category = name, messages = messages.len(), "category deleted")
            }
            None => tracing::debug!(category = name, "delete of absent category"),
        }
        Ok(())
    }

    pub async fn add_message(&mut self, category: &str, text: &str) -> Result<()> {
        self.refresh().await?;
        if !self.data.contains(category) {
            return Err(StoreError::NotFound(category.to_string()));
        }
        let text = non_blank(text, "Message text")?;

        let mut next = self.data.clone();
        if let Some(messages) = next.get_mut(category) {
            messages.push(text.to_string());
        }
        self.commit(next).await?;
        tracing::info!(category, "message added");
        Ok(())
    }

    pub async fn edit_message(&mut self, category: &str, index: usize, text: &str) -> Result<()> {
        self.refresh().await?;
        let len = self.message_count(category)?;
        if index >= len {
            return Err(StoreError::Index {
                category: category.to_string(),
                index,
                len,
            });
        }
        let text = non_blank(text, "Message text")?;

        let mut next = self.data.clone();
        if let Some(messages) = next.get_mut(category) {
            messages[index] = text.to_string();
        }
        self.commit(next).await?;
        tracing::info!(category, index, "message edited");
        Ok(())
    }

    /// Remove the message at `index`, shifting later messages down. Returns
    /// the removed text.
    pub async fn delete_message(&mut self, category: &str, index: usize) -> Result<String> {
        self.refresh().await?;
        let len = self.message_count(category)?;
        if index >= len {
            return Err(StoreError::Index {
                category: category.to_string(),
                index,
                len,
            });
        }

        let mut next = self.data.clone();
        let removed = next
            .get_mut(category)
            .map(|messages| messages.remove(index))
            .unwrap_or_default();
        self.commit(next).await?;
        tracing::info!(category, index, "message deleted");
        Ok(removed)
    }

    /// Drop the persisted value; the next [`load`](Self::load) re-seeds defaults.
    pub async fn reset(&mut self) -> Result<()> {
        self.backend.remove(&self.key).await?;
        self.data = TemplateSet::new();
        tracing::info!("templates reset");
        Ok(())
    }

    fn message_count(&self, category: &str) -> Result<usize> {
        self.data
            .get(category)
            .map(<[String]>::len)
            .ok_or_else(|| StoreError::NotFound(category.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{JsonFileStore, MemoryStore};
    use serde_json::json;

    fn sample() -> TemplateSet {
        TemplateSet::from_pairs([
            ("greeting", vec!["Hello there", "Hi, welcome"]),
            ("closing", vec!["Goodbye"]),
        ])
    }

    async fn loaded_store() -> TemplateStore<MemoryStore> {
        let backend = MemoryStore::new();
        backend.insert_raw(DEFAULT_STORAGE_KEY, sample().to_value());
        let mut store = TemplateStore::new(backend);
        store.load().await.unwrap();
        store
    }

    #[tokio::test]
    async fn load_seeds_defaults_once() {
        let mut store = TemplateStore::new(MemoryStore::new());
        let loaded = store.load().await.unwrap().clone();
        assert_eq!(loaded, default_templates());
        assert_eq!(store.backend().write_count(), 1);
        assert_eq!(
            store.backend().snapshot(DEFAULT_STORAGE_KEY),
            Some(default_templates().to_value())
        );

        store.load().await.unwrap();
        assert_eq!(store.backend().write_count(), 1);
    }

    #[tokio::test]
    async fn load_reads_existing_without_writing() {
        let store = loaded_store().await;
        assert_eq!(store.data(), &sample());
        assert_eq!(store.backend().write_count(), 0);
    }

    #[tokio::test]
    async fn load_of_corrupt_value_is_storage_error() {
        let backend = MemoryStore::new();
        backend.insert_raw(DEFAULT_STORAGE_KEY, json!({"greeting": "oops"}));
        let mut store = TemplateStore::new(backend);
        assert!(matches!(store.load().await, Err(StoreError::Storage(_))));
        assert_eq!(store.backend().write_count(), 0);
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut store = TemplateStore::new(JsonFileStore::new(dir.path()));
        store.save(sample()).await.unwrap();

        let mut fresh = TemplateStore::new(JsonFileStore::new(dir.path()));
        assert_eq!(fresh.load().await.unwrap(), &sample());
    }

    #[tokio::test]
    async fn save_rejects_empty_set() {
        let mut store = loaded_store().await;
        let err = store.save(TemplateSet::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(store.backend().write_count(), 0);
        assert_eq!(store.data(), &sample());
    }

    #[tokio::test]
    async fn save_value_validates_shape() {
        let mut store = loaded_store().await;
        let err = store.save_value(&json!({"a": [1]})).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        store.save_value(&json!({"a": ["x"]})).await.unwrap();
        assert_eq!(store.data().get("a").unwrap(), ["x".to_string()]);
    }

    #[tokio::test]
    async fn save_surfaces_storage_failure_and_keeps_state() {
        let mut store = loaded_store().await;
        store.backend().set_fail_writes(true);
        let err = store
            .save(TemplateSet::from_pairs([("other", vec!["x"])]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Storage(ref reason) if reason.contains("quota")));
        assert_eq!(store.data(), &sample());
        assert_eq!(store.backend().snapshot(DEFAULT_STORAGE_KEY), Some(sample().to_value()));
    }

    #[tokio::test]
    async fn add_category_appends_empty_list() {
        let mut store = loaded_store().await;
        store.add_category("  follow-up ").await.unwrap();
        assert_eq!(
            store.data().names().collect::<Vec<_>>(),
            vec!["greeting", "closing", "follow-up"]
        );
        assert_eq!(store.data().get("follow-up").unwrap().len(), 0);
        assert_eq!(store.backend().write_count(), 1);
    }

    #[tokio::test]
    async fn add_category_rejects_duplicates_and_blanks() {
        let mut store = loaded_store().await;
        assert_eq!(
            store.add_category("greeting").await,
            Err(StoreError::DuplicateCategory("greeting".into()))
        );
        assert_eq!(store.add_category("   ").await, Err(StoreError::EmptyText("Category name")));
        // Case-sensitive match: a differently-cased name is a new category
        store.add_category("Greeting").await.unwrap();
        assert_eq!(store.backend().write_count(), 1);
    }

    #[tokio::test]
    async fn rename_onto_existing_category_fails() {
        let mut store = loaded_store().await;
        assert_eq!(
            store.rename_category("greeting", "closing").await,
            Err(StoreError::DuplicateCategory("closing".into()))
        );
        assert_eq!(store.data(), &sample());
    }

    #[tokio::test]
    async fn rename_missing_category_fails() {
        let mut store = loaded_store().await;
        assert_eq!(
            store.rename_category("unknown", "other").await,
            Err(StoreError::NotFound("unknown".into()))
        );
    }

    #[tokio::test]
    async fn rename_to_blank_name_fails() {
        let mut store = loaded_store().await;
        assert_eq!(
            store.rename_category("greeting", "   ").await,
            Err(StoreError::EmptyText("Category name"))
        );
        assert_eq!(store.data(), &sample());
        assert_eq!(store.backend().write_count(), 0);
    }

    #[tokio::test]
    async fn rename_moves_messages_in_order() {
        let mut store = loaded_store().await;
        store.rename_category("greeting", "hello").await.unwrap();
        assert!(!store.data().contains("greeting"));
        assert_eq!(
            store.data().get("hello").unwrap(),
            ["Hello there".to_string(), "Hi, welcome".to_string()]
        );
        assert_eq!(store.data().names().collect::<Vec<_>>(), vec!["closing", "hello"]);
        assert_eq!(store.backend().write_count(), 1);
    }

    #[tokio::test]
    async fn rename_to_same_name_is_allowed() {
        let mut store = loaded_store().await;
        store.rename_category("greeting", "greeting").await.unwrap();
        assert_eq!(store.data(), &sample());
        assert_eq!(store.backend().write_count(), 1);
    }

    #[tokio::test]
    async fn delete_category_is_idempotent() {
        let mut store = loaded_store().await;
        store.delete_category("greeting").await.unwrap();
        let once = store.data().clone();
        store.delete_category("greeting").await.unwrap();
        assert_eq!(store.data(), &once);
        assert_eq!(once.names().collect::<Vec<_>>(), vec!["closing"]);
        assert_eq!(store.backend().write_count(), 2);
    }

    #[tokio::test]
    async fn deleting_last_category_persists_empty_set() {
        let mut store = loaded_store().await;
        store.delete_category("greeting").await.unwrap();
        store.delete_category("closing").await.unwrap();
        assert!(store.data().is_empty());
        assert_eq!(store.backend().snapshot(DEFAULT_STORAGE_KEY), Some(json!({})));

        // An empty persisted set is not re-seeded
        store.load().await.unwrap();
        assert!(store.data().is_empty());
    }

    #[tokio::test]
    async fn add_message_to_unknown_category_fails() {
        let mut store = loaded_store().await;
        assert_eq!(
            store.add_message("unknown", "hi").await,
            Err(StoreError::NotFound("unknown".into()))
        );
    }

    #[tokio::test]
    async fn add_message_trims_and_appends() {
        let mut store = loaded_store().await;
        store.add_message("closing", "  See you soon \n").await.unwrap();
        assert_eq!(
            store.data().get("closing").unwrap(),
            ["Goodbye".to_string(), "See you soon".to_string()]
        );
        assert_eq!(
            store.add_message("closing", " \t ").await,
            Err(StoreError::EmptyText("Message text"))
        );
    }

    #[tokio::test]
    async fn edit_message_replaces_in_place() {
        let mut store = loaded_store().await;
        store.edit_message("greeting", 0, "Hello!").await.unwrap();
        assert_eq!(
            store.data().get("greeting").unwrap(),
            ["Hello!".to_string(), "Hi, welcome".to_string()]
        );
    }

    #[tokio::test]
    async fn edit_message_checks_bounds_and_text() {
        let mut store = loaded_store().await;
        assert!(matches!(
            store.edit_message("greeting", 2, "x").await,
            Err(StoreError::Index { index: 2, len: 2, .. })
        ));
        assert_eq!(
            store.edit_message("greeting", 1, "").await,
            Err(StoreError::EmptyText("Message text"))
        );
        assert_eq!(
            store.edit_message("nope", 0, "x").await,
            Err(StoreError::NotFound("nope".into()))
        );
        assert_eq!(store.backend().write_count(), 0);
    }

    #[tokio::test]
    async fn delete_message_out_of_bounds_fails() {
        let mut store = loaded_store().await;
        assert!(matches!(
            store.delete_message("greeting", 5).await,
            Err(StoreError::Index { index: 5, len: 2, .. })
        ));
    }

    #[tokio::test]
    async fn delete_message_from_unknown_category_fails() {
        let mut store = loaded_store().await;
        assert_eq!(
            store.delete_message("unknown", 0).await,
            Err(StoreError::NotFound("unknown".into()))
        );
        assert_eq!(store.backend().write_count(), 0);
    }

    #[tokio::test]
    async fn delete_message_shifts_later_entries() {
        let mut store = loaded_store().await;
        store.add_message("greeting", "Good morning").await.unwrap();
        let removed = store.delete_message("greeting", 0).await.unwrap();
        assert_eq!(removed, "Hello there");
        assert_eq!(
            store.data().get("greeting").unwrap(),
            ["Hi, welcome".to_string(), "Good morning".to_string()]
        );
    }

    #[tokio::test]
    async fn failed_mutation_keeps_memory_and_persisted_state() {
        let mut store = loaded_store().await;
        store.backend().set_fail_writes(true);
        assert!(matches!(
            store.add_message("greeting", "new").await,
            Err(StoreError::Storage(_))
        ));
        assert!(store.delete_category("closing").await.is_err());
        assert_eq!(store.data(), &sample());
        assert_eq!(store.backend().snapshot(DEFAULT_STORAGE_KEY), Some(sample().to_value()));

        store.backend().set_fail_writes(false);
        store.add_message("greeting", "new").await.unwrap();
        assert_eq!(store.data().get("greeting").unwrap().len(), 3);
    }

    #[tokio::test]
    async fn mutation_before_load_loads_first() {
        let backend = MemoryStore::new();
        backend.insert_raw(DEFAULT_STORAGE_KEY, sample().to_value());
        let mut store = TemplateStore::new(backend);
        store.add_message("closing", "Bye").await.unwrap();
        assert_eq!(store.data().get("greeting").unwrap().len(), 2);
        assert_eq!(store.data().get("closing").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn reset_removes_value_and_reseeds_on_load() {
        let mut store = loaded_store().await;
        store.reset().await.unwrap();
        assert!(store.data().is_empty());
        assert_eq!(store.backend().snapshot(DEFAULT_STORAGE_KEY), None);
        assert_eq!(store.load().await.unwrap(), &default_templates());
    }

    #[tokio::test]
    async fn custom_key_is_used() {
        let mut store = TemplateStore::with_key(MemoryStore::new(), "altData");
        store.load().await.unwrap();
        assert!(store.backend().snapshot("altData").is_some());
        assert!(store.backend().snapshot(DEFAULT_STORAGE_KEY).is_none());
    }

    #[tokio::test]
    async fn mutations_build_on_writes_from_another_instance() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut server = TemplateStore::new(JsonFileStore::new(dir.path()));
        let mut cli = TemplateStore::new(JsonFileStore::new(dir.path()));
        server.load().await.unwrap();

        cli.add_category("from-cli").await.unwrap();
        server.add_message("banking", "hello").await.unwrap();

        let mut fresh = TemplateStore::new(JsonFileStore::new(dir.path()));
        let set = fresh.load().await.unwrap();
        assert_eq!(
            set.names().collect::<Vec<_>>(),
            vec!["tax-pending-task", "tax-on-hold", "banking", "banking-on-hold", "from-cli"]
        );
        assert_eq!(set.get("banking").unwrap().last().map(String::as_str), Some("hello"));
    }
}
