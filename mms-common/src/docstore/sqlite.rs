//! SQLite-backed document mirror

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use std::path::Path;
use tracing::{debug, info};

use super::{DocumentStore, Filter};
use crate::db::{connect_file, connect_memory};
use crate::{time, Error, Result};

const CREATE_DOCUMENTS: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    doc_key TEXT NOT NULL,
    body TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (collection, doc_key)
)
"#;

/// JSON documents stored one per row, keyed by collection and key
#[derive(Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    /// Wrap an existing pool, creating the documents table if needed
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        sqlx::query(CREATE_DOCUMENTS).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Open (or create) a mirror file
    pub async fn open(path: &Path) -> Result<Self> {
        let store = Self::new(connect_file(path).await?).await?;
        info!("Document mirror ready: {}", path.display());
        Ok(store)
    }

    pub async fn in_memory() -> Result<Self> {
        Self::new(connect_memory().await?).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>> {
        // String and integer fields are narrowed in SQL (json_each covers both a
        // scalar field and an array field); the exact match is checked on the
        // decoded body.
        let mut sql = String::from("SELECT body FROM documents WHERE collection = ?");
        let pushed: Vec<(String, &Value)> = filter
            .fields()
            .iter()
            .filter(|(_, v)| v.is_string() || v.is_i64())
            .map(|(f, v)| (format!("$.\"{}\"", f.replace('"', "")), v))
            .collect();
        for _ in &pushed {
            sql.push_str(" AND EXISTS (SELECT 1 FROM json_each(documents.body, ?) WHERE json_each.value = ?)");
        }
        sql.push_str(" ORDER BY doc_key");

        let mut query = sqlx::query(&sql).bind(collection);
        for (path, value) in &pushed {
            query = query.bind(path.as_str());
            query = match value {
                Value::String(s) => query.bind(s.as_str()),
                other => query.bind(other.as_i64()),
            };
        }

        let rows = query.fetch_all(&self.pool).await?;
        let mut docs = Vec::with_capacity(rows.len());
        for row in rows {
            let doc: Value = serde_json::from_str(&row.get::<String, _>("body"))?;
            if filter.matches(&doc) {
                docs.push(doc);
            }
            if filter.max_results().is_some_and(|n| docs.len() >= n) {
                break;
            }
        }
        debug!(collection, matched = docs.len(), "Document query");
        Ok(docs)
    }

    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>> {
        let body: Option<String> =
            sqlx::query_scalar("SELECT body FROM documents WHERE collection = ? AND doc_key = ?")
                .bind(collection)
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        body.map(|b| serde_json::from_str(&b).map_err(Error::from))
            .transpose()
    }

    async fn insert(&self, collection: &str, key: &str, doc: &Value) -> Result<()> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO documents (collection, doc_key, body) VALUES (?, ?, ?)",
        )
        .bind(collection)
        .bind(key)
        .bind(serde_json::to_string(doc)?)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::DocumentStore(format!(
                "document {}/{} already exists",
                collection, key
            )));
        }
        Ok(())
    }

    async fn upsert(&self, collection: &str, key: &str, doc: &Value) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (collection, doc_key, body) VALUES (?, ?, ?)
            ON CONFLICT (collection, doc_key) DO UPDATE
              SET body = excluded.body,
                  updated_at = ?
            "#,
        )
        .bind(collection)
        .bind(key)
        .bind(serde_json::to_string(doc)?)
        .bind(time::to_sql(&time::now()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_get_and_duplicate() {
        let store = SqliteDocumentStore::in_memory().await.unwrap();
        let doc = json!({"id": 1, "name": "one"});

        store.insert("things", "thing::1", &doc).await.unwrap();
        assert_eq!(store.get("things", "thing::1").await.unwrap(), Some(doc.clone()));
        assert_eq!(store.get("other", "thing::1").await.unwrap(), None);

        let err = store.insert("things", "thing::1", &doc).await.unwrap_err();
        assert!(matches!(err, Error::DocumentStore(_)));
    }

    #[tokio::test]
    async fn test_upsert_replaces_whole_document() {
        let store = SqliteDocumentStore::in_memory().await.unwrap();
        store
            .upsert("things", "k", &json!({"a": 1, "b": 2}))
            .await
            .unwrap();
        store.upsert("things", "k", &json!({"a": 3})).await.unwrap();

        assert_eq!(store.get("things", "k").await.unwrap(), Some(json!({"a": 3})));
    }

    #[tokio::test]
    async fn test_find_by_fields() {
        let store = SqliteDocumentStore::in_memory().await.unwrap();
        store.upsert("r", "1", &json!({"id": 1, "category": "video", "active": true})).await.unwrap();
        store.upsert("r", "2", &json!({"id": 2, "category": "video", "active": false})).await.unwrap();
        store.upsert("r", "3", &json!({"id": 3, "category": "audio", "active": true})).await.unwrap();

        let videos = store.find("r", &Filter::new().eq("category", "video")).await.unwrap();
        assert_eq!(videos.len(), 2);

        let active_videos = store
            .find("r", &Filter::new().eq("category", "video").eq("active", true))
            .await
            .unwrap();
        assert_eq!(active_videos.len(), 1);
        assert_eq!(active_videos[0]["id"], 1);

        assert_eq!(store.find("r", &Filter::new()).await.unwrap().len(), 3);
        assert_eq!(store.find("r", &Filter::new().limit(2)).await.unwrap().len(), 2);
        store.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_find_matches_array_field() {
        let store = SqliteDocumentStore::in_memory().await.unwrap();
        store.upsert("r", "1", &json!({"id": 1, "keywords": ["PD2018", "heart"]})).await.unwrap();
        store.upsert("r", "2", &json!({"id": 2, "keywords": ["lung"]})).await.unwrap();

        let found = store.find("r", &Filter::new().eq("keywords", "PD2018")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["id"], 1);
    }
}
