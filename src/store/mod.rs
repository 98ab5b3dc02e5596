// src/store/mod.rs
//
// The durable keyed document store backing the workflow. Collections hold
// JSON documents addressed by id; partial updates merge at the top level and
// silently drop fields patched to `null` rather than writing them. No
// cross-document transactions are assumed.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::AppError;

/// Collection names used by the application.
pub mod collections {
    pub const EXAMS: &str = "exams";
    pub const SUBMISSIONS: &str = "submissions";
    pub const HEADQUARTERS: &str = "headquarters";
    pub const USERS: &str = "users";
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents in a collection as (id, body) pairs, ordered by id.
    async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>, AppError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, AppError>;

    /// Inserts a document under a generated id and returns it.
    async fn insert(&self, collection: &str, body: Value) -> Result<String, AppError>;

    /// Inserts under a caller-chosen key (e.g. a headquarters code).
    /// Fails with `Conflict` when the key is already taken.
    async fn insert_with_id(
        &self,
        collection: &str,
        id: &str,
        body: Value,
    ) -> Result<(), AppError>;

    /// Inserts or fully replaces the document under `id` in one write, so a
    /// failed replace leaves the prior document in place.
    async fn replace(&self, collection: &str, id: &str, body: Value) -> Result<(), AppError>;

    /// Top-level merge of `patch` into the stored document. `null` fields in
    /// the patch are dropped, not written. `NotFound` when the id is absent.
    async fn update_merge(&self, collection: &str, id: &str, patch: Value) -> Result<(), AppError>;

    /// Deleting an absent id is a no-op, mirroring the store's semantics.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError>;
}

/// Applies the store's merge semantics to an in-memory document.
pub(crate) fn merge_document(base: &mut Value, patch: &Value) {
    let (Value::Object(base_map), Value::Object(patch_map)) = (base, patch) else {
        return;
    };
    for (key, value) in patch_map {
        if value.is_null() {
            continue;
        }
        base_map.insert(key.clone(), value.clone());
    }
}

fn corrupt(collection: &str, id: &str, err: impl std::fmt::Display) -> AppError {
    AppError::InternalServerError(format!(
        "Corrupt document {}/{}: {}",
        collection, id, err
    ))
}

/// Fetches and deserializes one document, injecting the document id into the
/// body so model types carry it like any other field.
pub async fn fetch_one<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
) -> Result<Option<T>, AppError> {
    match store.get(collection, id).await? {
        Some(mut body) => {
            inject_id(&mut body, id);
            let value = serde_json::from_value(body).map_err(|e| corrupt(collection, id, e))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

/// Fetches and deserializes a whole collection.
pub async fn fetch_all<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
) -> Result<Vec<T>, AppError> {
    let mut out = Vec::new();
    for (id, mut body) in store.list(collection).await? {
        inject_id(&mut body, &id);
        out.push(serde_json::from_value(body).map_err(|e| corrupt(collection, &id, e))?);
    }
    Ok(out)
}

/// Serializes a model into a document body, stripping the id field (the id
/// lives in the document key, not the body).
pub fn to_document<T: Serialize>(value: &T) -> Result<Value, AppError> {
    let mut body = serde_json::to_value(value)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    if let Value::Object(map) = &mut body {
        map.remove("id");
        map.remove("code");
    }
    Ok(body)
}

fn inject_id(body: &mut Value, id: &str) {
    if let Value::Object(map) = body {
        map.insert("id".to_string(), Value::String(id.to_string()));
        // Headquarters documents are keyed by their code.
        map.entry("code".to_string())
            .or_insert_with(|| Value::String(id.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_overwrites_present_fields_and_drops_nulls() {
        let mut base = json!({"status": "Submitted", "finalScore": 12, "keep": true});
        let patch = json!({"status": "人事確認中", "finalScore": null, "added": "x"});

        merge_document(&mut base, &patch);

        assert_eq!(base["status"], "人事確認中");
        assert_eq!(base["finalScore"], 12, "null patch fields must be dropped");
        assert_eq!(base["keep"], true);
        assert_eq!(base["added"], "x");
    }
}
