//! Document store abstraction
//!
//! Documents are JSON values addressed by `(collection, key)`. The mirror is
//! a [`SqliteDocumentStore`]; the CouchDB client in `mms-jobs` implements the
//! same trait.

mod sqlite;

pub use sqlite::SqliteDocumentStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::Result;

pub const MEMBERS: &str = "members";
pub const RESOURCES: &str = "resources";

/// Top-level field equality filter
///
/// A scalar value also matches a document whose field is an array
/// containing that value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    fields: Vec<(String, Value)>,
    limit: Option<usize>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field` to equal `value`
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((field.into(), value.into()));
        self
    }

    /// Return at most `n` documents
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn max_results(&self) -> Option<usize> {
        self.limit
    }

    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// True when every field of the filter is present in `doc` with a matching value
    pub fn matches(&self, doc: &Value) -> bool {
        self.fields.iter().all(|(field, value)| match doc.get(field) {
            Some(Value::Array(items)) if !value.is_array() => items.contains(value),
            Some(found) => found == value,
            None => false,
        })
    }

    /// Filter as a CouchDB Mango selector
    pub fn to_selector(&self) -> Value {
        let clauses: Vec<Value> = self
            .fields
            .iter()
            .map(|(field, value)| {
                if value.is_array() || value.is_object() {
                    json!({ field: value })
                } else {
                    json!({ "$or": [
                        { field: value },
                        { field: { "$elemMatch": { "$eq": value } } }
                    ] })
                }
            })
            .collect();
        match clauses.len() {
            0 => Value::Object(Map::new()),
            _ => json!({ "$and": clauses }),
        }
    }
}

/// Result of a timestamp-guarded sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOutcome {
    /// No document existed; one was inserted
    Inserted,
    /// The incoming document was newer and replaced the stored one
    Replaced,
    /// The stored document was already current
    Unchanged,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents in `collection` matching `filter`
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>>;

    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>>;

    /// Insert a new document; fails if the key is already present
    async fn insert(&self, collection: &str, key: &str, doc: &Value) -> Result<()>;

    /// Insert, or replace the whole document when the key is present
    async fn upsert(&self, collection: &str, key: &str, doc: &Value) -> Result<()>;

    /// Check the store is reachable
    async fn ping(&self) -> Result<()>;
}

/// Insert when absent; replace only when `updated_of(doc)` is strictly newer
/// than the stored document's.
pub(crate) async fn sync_document<T, F>(
    store: &dyn DocumentStore,
    collection: &str,
    key: &str,
    doc: &T,
    updated_of: F,
) -> Result<SyncOutcome>
where
    T: Serialize + DeserializeOwned,
    F: Fn(&T) -> DateTime<Utc>,
{
    let value = serde_json::to_value(doc)?;

    let Some(stored) = store.get(collection, key).await? else {
        store.insert(collection, key, &value).await?;
        debug!(collection, key, "Mirror document inserted");
        return Ok(SyncOutcome::Inserted);
    };

    let stored: T = serde_json::from_value(stored)?;
    let incoming_updated = updated_of(doc);
    let stored_updated = updated_of(&stored);

    if incoming_updated > stored_updated {
        store.upsert(collection, key, &value).await?;
        debug!(collection, key, %stored_updated, %incoming_updated, "Mirror document replaced");
        Ok(SyncOutcome::Replaced)
    } else {
        debug!(collection, key, %stored_updated, "Mirror document already current");
        Ok(SyncOutcome::Unchanged)
    }
}

/// Decode every document, skipping nothing: one bad document fails the search
pub(crate) fn decode_all<T: DeserializeOwned>(docs: Vec<Value>) -> Result<Vec<T>> {
    docs.into_iter()
        .map(|d| serde_json::from_value(d).map_err(Into::into))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_matches_top_level_fields() {
        let doc = json!({"id": 3, "type": "resource", "active": true});

        assert!(Filter::new().matches(&doc));
        assert!(Filter::new().eq("id", 3).eq("type", "resource").matches(&doc));
        assert!(!Filter::new().eq("id", 4).matches(&doc));
        assert!(!Filter::new().eq("missing", "x").matches(&doc));
    }

    #[test]
    fn test_filter_scalar_matches_array_member() {
        let doc = json!({"keywords": ["PD2018", "heart"]});
        assert!(Filter::new().eq("keywords", "PD2018").matches(&doc));
        assert!(!Filter::new().eq("keywords", "lung").matches(&doc));
        assert!(Filter::new().eq("keywords", json!(["PD2018", "heart"])).matches(&doc));
    }

    #[test]
    fn test_filter_selector() {
        assert_eq!(Filter::new().to_selector(), json!({}));

        let selector = Filter::new().eq("lastName", "Donnici").to_selector();
        assert_eq!(
            selector,
            json!({"$and": [{"$or": [
                {"lastName": "Donnici"},
                {"lastName": {"$elemMatch": {"$eq": "Donnici"}}}
            ]}]})
        );
    }

    #[test]
    fn test_sync_outcome_serializes_lowercase() {
        assert_eq!(serde_json::to_value(SyncOutcome::Replaced).unwrap(), json!("replaced"));
    }
}
