//! Library resources (articles, webcasts, ...) and their mirror documents
//!
//! Resources are keyed `resource::<id>` in the `resources` collection. The
//! mirror document is the serialized [`Resource`].

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::docstore::{decode_all, sync_document, DocumentStore, Filter, SyncOutcome, RESOURCES};
use crate::member::reader::opt_date;
use crate::{time, Error, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Resource {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_on: Option<NaiveDate>,
    /// Category, e.g. "Journal Article"
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub resource_url: String,
    pub active: bool,
}

pub fn doc_key(id: i64) -> String {
    format!("resource::{}", id)
}

const SELECT_RESOURCE: &str = r#"
SELECT id, created_at, updated_at, published_on, resource_type, name,
       description, keywords, resource_url, active
FROM resource
"#;

fn from_row(r: &SqliteRow) -> Result<Resource> {
    Ok(Resource {
        id: r.get("id"),
        created_at: time::parse_timestamp(&r.get::<String, _>("created_at"))?,
        updated_at: time::parse_timestamp(&r.get::<String, _>("updated_at"))?,
        published_on: opt_date(r.get("published_on"))?,
        resource_type: r.get("resource_type"),
        name: r.get("name"),
        description: r.get("description"),
        keywords: split_keywords(&r.get::<String, _>("keywords")),
        resource_url: r.get("resource_url"),
        active: r.get("active"),
    })
}

fn split_keywords(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

fn join_keywords(keywords: &[String]) -> String {
    keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

pub async fn resource_by_id(pool: &SqlitePool, id: i64) -> Result<Resource> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_RESOURCE))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("resource id {}", id)))?;
    from_row(&row)
}

async fn resource_id_by_url(pool: &SqlitePool, url: &str) -> Result<Option<i64>> {
    let id = sqlx::query_scalar("SELECT id FROM resource WHERE resource_url = ? ORDER BY id LIMIT 1")
        .bind(url)
        .fetch_optional(pool)
        .await?;
    Ok(id)
}

/// Insert a new resource and set its id
pub async fn insert_resource(pool: &SqlitePool, resource: &mut Resource) -> Result<i64> {
    if resource.id != 0 {
        return Err(Error::IdAlreadySet("resource"));
    }
    if resource.name.trim().is_empty() {
        return Err(Error::InvalidInput("resource name is required".into()));
    }

    let now = time::to_sql(&time::now());
    let result = sqlx::query(
        r#"
        INSERT INTO resource (resource_type, name, description, keywords, resource_url,
                              published_on, active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?)
        "#,
    )
    .bind(&resource.resource_type)
    .bind(&resource.name)
    .bind(&resource.description)
    .bind(join_keywords(&resource.keywords))
    .bind(&resource.resource_url)
    .bind(resource.published_on.as_ref().map(time::date_to_sql))
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    resource.id = result.last_insert_rowid();
    info!(resource_id = resource.id, "Inserted resource");
    Ok(resource.id)
}

/// Save a resource, matching on resource URL
///
/// A resource whose URL is already stored updates that record: non-empty
/// fields overwrite the stored values and `updated_at` moves only when
/// something changed. Otherwise a new record is inserted. Either way the
/// resource id is set and returned.
pub async fn save_resource(pool: &SqlitePool, resource: &mut Resource) -> Result<i64> {
    if resource.resource_url.trim().is_empty() {
        return Err(Error::InvalidInput("resource URL is required".into()));
    }
    let Some(id) = resource_id_by_url(pool, &resource.resource_url).await? else {
        resource.id = 0;
        return insert_resource(pool, resource).await;
    };
    resource.id = id;

    let result = sqlx::query(
        r#"
        UPDATE resource SET
            resource_type = CASE WHEN ? = '' THEN resource_type ELSE ? END,
            name = CASE WHEN ? = '' THEN name ELSE ? END,
            description = CASE WHEN ? = '' THEN description ELSE ? END,
            keywords = CASE WHEN ? = '' THEN keywords ELSE ? END,
            published_on = COALESCE(?, published_on),
            updated_at = ?
        WHERE id = ?
          AND (
            (? <> '' AND ? <> resource_type) OR
            (? <> '' AND ? <> name) OR
            (? <> '' AND ? <> description) OR
            (? <> '' AND ? <> keywords) OR
            (? IS NOT NULL AND ? IS NOT published_on)
          )
        "#,
    )
    .bind(&resource.resource_type)
    .bind(&resource.resource_type)
    .bind(&resource.name)
    .bind(&resource.name)
    .bind(&resource.description)
    .bind(&resource.description)
    .bind(join_keywords(&resource.keywords))
    .bind(join_keywords(&resource.keywords))
    .bind(resource.published_on.as_ref().map(time::date_to_sql))
    .bind(time::to_sql(&time::now()))
    .bind(id)
    .bind(&resource.resource_type)
    .bind(&resource.resource_type)
    .bind(&resource.name)
    .bind(&resource.name)
    .bind(&resource.description)
    .bind(&resource.description)
    .bind(join_keywords(&resource.keywords))
    .bind(join_keywords(&resource.keywords))
    .bind(resource.published_on.as_ref().map(time::date_to_sql))
    .bind(resource.published_on.as_ref().map(time::date_to_sql))
    .execute(pool)
    .await?;

    info!(resource_id = id, changed = result.rows_affected() > 0, "Saved existing resource");
    Ok(id)
}

/// All active resource ids in ascending order
pub async fn resource_ids(pool: &SqlitePool) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar("SELECT id FROM resource WHERE active = 1 ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(ids)
}

/// Ids of active resources updated at or after `since`
pub async fn resource_ids_updated_since(pool: &SqlitePool, since: DateTime<Utc>) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar("SELECT id FROM resource WHERE active = 1 AND updated_at >= ? ORDER BY id")
        .bind(time::to_sql(&since))
        .fetch_all(pool)
        .await?;
    Ok(ids)
}

/// Write the resource document, replacing any stored copy
pub async fn save_resource_doc(store: &dyn DocumentStore, resource: &Resource) -> Result<()> {
    let doc = serde_json::to_value(resource)?;
    store.upsert(RESOURCES, &doc_key(resource.id), &doc).await?;
    info!(resource_id = resource.id, "Saved resource document");
    Ok(())
}

/// Insert the resource document when absent, replace it when `resource` is newer
pub async fn sync_resource_doc(store: &dyn DocumentStore, resource: &Resource) -> Result<SyncOutcome> {
    let outcome = sync_document(store, RESOURCES, &doc_key(resource.id), resource, |r: &Resource| {
        r.updated_at
    })
    .await?;
    info!(resource_id = resource.id, ?outcome, "Synced resource document");
    Ok(outcome)
}

/// Run [`sync_resource_doc`] on a background task
///
/// The handle may be awaited for the outcome or dropped; a failure is also
/// logged from the task itself.
pub fn spawn_resource_sync(store: Arc<dyn DocumentStore>, resource: Resource) -> JoinHandle<Result<SyncOutcome>> {
    tokio::spawn(async move {
        let result = sync_resource_doc(store.as_ref(), &resource).await;
        if let Err(e) = &result {
            warn!(resource_id = resource.id, error = %e, "Background resource sync failed");
        }
        result
    })
}

/// Resource documents matching the filter
pub async fn search_resource_docs(store: &dyn DocumentStore, filter: &Filter) -> Result<Vec<Resource>> {
    decode_all(store.find(RESOURCES, filter).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_database;
    use crate::docstore::SqliteDocumentStore;
    use chrono::Duration;

    fn article(url: &str) -> Resource {
        Resource {
            name: "Statin therapy".into(),
            resource_type: "Journal Article".into(),
            keywords: vec!["PD2018".into(), "lipids".into()],
            resource_url: url.into(),
            published_on: NaiveDate::from_ymd_opt(2017, 8, 22),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let pool = init_memory_database().await.unwrap();
        let mut r = article("https://doi.org/10.1053/j.gastro.2017.08.022");
        let id = insert_resource(&pool, &mut r).await.unwrap();
        assert_eq!(r.id, id);

        let stored = resource_by_id(&pool, id).await.unwrap();
        assert_eq!(stored.resource_url, r.resource_url);
        assert_eq!(stored.keywords, vec!["PD2018", "lipids"]);
        assert!(stored.active);
        assert_eq!(resource_ids(&pool).await.unwrap(), vec![id]);
    }

    #[tokio::test]
    async fn test_insert_rejects_existing_id() {
        let pool = init_memory_database().await.unwrap();
        let mut r = Resource { id: 7, ..article("https://x.org/1") };
        let err = insert_resource(&pool, &mut r).await.unwrap_err();
        assert!(err.to_string().contains("ID already has a value"));
    }

    #[tokio::test]
    async fn test_save_existing_url_updates_in_place() {
        let pool = init_memory_database().await.unwrap();
        let url = "https://doi.org/10.1016/j.jaci.2017.03.020";
        let id = insert_resource(&pool, &mut article(url)).await.unwrap();

        // Nothing to change
        let mut same = Resource { resource_url: url.into(), ..Default::default() };
        assert_eq!(save_resource(&pool, &mut same).await.unwrap(), id);
        assert_eq!(same.id, id);

        let mut renamed = Resource { name: "New name".into(), resource_url: url.into(), ..Default::default() };
        assert_eq!(save_resource(&pool, &mut renamed).await.unwrap(), id);
        let stored = resource_by_id(&pool, id).await.unwrap();
        assert_eq!(stored.name, "New name");
        assert_eq!(stored.resource_type, "Journal Article");

        let mut fresh = article("https://x.org/new");
        let new_id = save_resource(&pool, &mut fresh).await.unwrap();
        assert_ne!(new_id, id);
    }

    #[tokio::test]
    async fn test_doc_search_by_keyword() {
        let store = SqliteDocumentStore::in_memory().await.unwrap();
        let mut r = article("https://x.org/a");
        r.id = 24967;
        save_resource_doc(&store, &r).await.unwrap();

        let by_kw = search_resource_docs(&store, &Filter::new().eq("keywords", "PD2018")).await.unwrap();
        assert_eq!(by_kw.len(), 1);
        assert_eq!(by_kw[0].resource_url, "https://x.org/a");
        assert!(search_resource_docs(&store, &Filter::new().eq("id", 25000)).await.unwrap().is_empty());

        let raw = store.get(RESOURCES, &doc_key(24967)).await.unwrap().unwrap();
        assert_eq!(raw["resourceUrl"], "https://x.org/a");
    }

    #[tokio::test]
    async fn test_spawned_sync_can_be_awaited() {
        let store: Arc<dyn DocumentStore> = Arc::new(SqliteDocumentStore::in_memory().await.unwrap());
        let mut r = article("https://x.org/b");
        r.id = 6576;

        let outcome = spawn_resource_sync(store.clone(), r.clone()).await.unwrap().unwrap();
        assert_eq!(outcome, SyncOutcome::Inserted);

        r.updated_at = r.updated_at + Duration::minutes(1);
        let outcome = spawn_resource_sync(store.clone(), r).await.unwrap().unwrap();
        assert_eq!(outcome, SyncOutcome::Replaced);
    }
}
