// src/store/memory.rs

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::AppError;
use crate::store::{DocumentStore, merge_document};

/// In-memory document store with the same merge semantics as the SQLite
/// backend. Used by the integration tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<HashMap<String, BTreeMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, body)| (id.clone(), body.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.get(collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn insert(&self, collection: &str, body: Value) -> Result<String, AppError> {
        let id = Uuid::new_v4().to_string();
        let mut inner = self.inner.write().await;
        inner
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), body);
        Ok(id)
    }

    async fn insert_with_id(
        &self,
        collection: &str,
        id: &str,
        body: Value,
    ) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        let docs = inner.entry(collection.to_string()).or_default();
        if docs.contains_key(id) {
            return Err(AppError::Conflict(format!(
                "Document '{}' already exists",
                id
            )));
        }
        docs.insert(id.to_string(), body);
        Ok(())
    }

    async fn replace(&self, collection: &str, id: &str, body: Value) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        inner
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), body);
        Ok(())
    }

    async fn update_merge(&self, collection: &str, id: &str, patch: Value) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        let doc = inner
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| AppError::NotFound(format!("Document '{}' not found", id)))?;
        merge_document(doc, &patch);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        if let Some(docs) = inner.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn replace_swaps_the_document_in_a_single_write() {
        let store = MemoryStore::new();
        store
            .insert_with_id("exams", "exam-1", json!({"title": "旧版", "questions": ["q1", "q2"]}))
            .await
            .unwrap();

        store
            .replace("exams", "exam-1", json!({"title": "新版", "questions": ["q1"]}))
            .await
            .unwrap();

        let doc = store.get("exams", "exam-1").await.unwrap().unwrap();
        assert_eq!(doc["title"], "新版");
        // A replace drops fields a merge would have kept.
        assert_eq!(doc["questions"].as_array().unwrap().len(), 1);

        // Replacing an absent id stores the document.
        store
            .replace("exams", "exam-2", json!({"title": "別の試験"}))
            .await
            .unwrap();
        assert!(store.get("exams", "exam-2").await.unwrap().is_some());
    }
}
