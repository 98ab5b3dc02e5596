// src/store/sqlite.rs

use std::str::FromStr;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use uuid::Uuid;

use crate::error::AppError;
use crate::store::{DocumentStore, merge_document};

/// Durable document store backed by a single SQLite table:
/// `documents(collection, id, body)` with JSON text bodies.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub async fn init_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id         TEXT NOT NULL,
                body       TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn parse_body(collection: &str, id: &str, raw: &str) -> Result<Value, AppError> {
    serde_json::from_str(raw).map_err(|e| {
        tracing::error!("Corrupt document body {}/{}: {:?}", collection, id, e);
        AppError::InternalServerError(format!("Corrupt document {}/{}", collection, id))
    })
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>, AppError> {
        let rows = sqlx::query("SELECT id, body FROM documents WHERE collection = ?1 ORDER BY id")
            .bind(collection)
            .fetch_all(&self.pool)
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.get("id");
            let raw: String = row.get("body");
            let body = parse_body(collection, &id, &raw)?;
            out.push((id, body));
        }
        Ok(out)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, AppError> {
        let row = sqlx::query("SELECT body FROM documents WHERE collection = ?1 AND id = ?2")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let raw: String = row.get("body");
                Ok(Some(parse_body(collection, id, &raw)?))
            }
            None => Ok(None),
        }
    }

    async fn insert(&self, collection: &str, body: Value) -> Result<String, AppError> {
        let id = Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3)")
            .bind(collection)
            .bind(&id)
            .bind(body.to_string())
            .execute(&self.pool)
            .await?;
        Ok(id)
    }

    async fn insert_with_id(
        &self,
        collection: &str,
        id: &str,
        body: Value,
    ) -> Result<(), AppError> {
        sqlx::query("INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3)")
            .bind(collection)
            .bind(id)
            .bind(body.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    AppError::Conflict(format!("Document '{}' already exists", id))
                }
                _ => AppError::from(e),
            })?;
        Ok(())
    }

    async fn replace(&self, collection: &str, id: &str, body: Value) -> Result<(), AppError> {
        sqlx::query("INSERT OR REPLACE INTO documents (collection, id, body) VALUES (?1, ?2, ?3)")
            .bind(collection)
            .bind(id)
            .bind(body.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_merge(&self, collection: &str, id: &str, patch: Value) -> Result<(), AppError> {
        // Read-then-write; no cross-document transactions are assumed and
        // concurrent writers are last-write-wins.
        let current = self
            .get(collection, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Document '{}' not found", id)))?;

        let mut merged = current;
        merge_document(&mut merged, &patch);

        sqlx::query("UPDATE documents SET body = ?1 WHERE collection = ?2 AND id = ?3")
            .bind(merged.to_string())
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM documents WHERE collection = ?1 AND id = ?2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
