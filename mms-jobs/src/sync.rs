//! Re-sync of recently updated records into the document mirror
//!
//! Walks members and/or resources updated within the last `backdays` days
//! and runs the timestamp-guarded sync on each. Any failure stops the run.

use chrono::{DateTime, Duration, Utc};
use clap::ValueEnum;
use mms_common::docstore::{DocumentStore, SyncOutcome};
use mms_common::{member, resource, time, Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Collection {
    #[value(alias = "member")]
    Members,
    #[value(alias = "resource")]
    Resources,
    All,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub inserted: usize,
    pub replaced: usize,
    pub unchanged: usize,
}

impl SyncSummary {
    fn record(&mut self, outcome: SyncOutcome) {
        match outcome {
            SyncOutcome::Inserted => self.inserted += 1,
            SyncOutcome::Replaced => self.replaced += 1,
            SyncOutcome::Unchanged => self.unchanged += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.inserted + self.replaced + self.unchanged
    }
}

/// Sync every record of `collection` updated within the last `backdays` days
pub async fn run_sync(
    pool: &SqlitePool,
    mirror: &dyn DocumentStore,
    collection: Collection,
    backdays: i64,
) -> Result<SyncSummary> {
    if backdays < 1 {
        return Err(Error::InvalidInput(format!(
            "backdays must be at least 1, got {}",
            backdays
        )));
    }
    let since = cutoff(time::now(), backdays)?;
    info!(backdays, ?collection, %since, "Running sync");

    let mut summary = SyncSummary::default();
    if matches!(collection, Collection::Members | Collection::All) {
        sync_members(pool, mirror, since, &mut summary).await?;
    }
    if matches!(collection, Collection::Resources | Collection::All) {
        sync_resources(pool, mirror, since, &mut summary).await?;
    }

    info!(?summary, "Sync finished");
    Ok(summary)
}

/// Start of the look-back window; out-of-range windows are rejected
fn cutoff(now: DateTime<Utc>, backdays: i64) -> Result<DateTime<Utc>> {
    Duration::try_days(backdays)
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or_else(|| Error::InvalidInput(format!("backdays {} is out of range", backdays)))
}

async fn sync_members(
    pool: &SqlitePool,
    mirror: &dyn DocumentStore,
    since: DateTime<Utc>,
    summary: &mut SyncSummary,
) -> Result<()> {
    let ids = member::member_ids_updated_since(pool, since).await?;
    info!(count = ids.len(), %since, "Syncing members");

    for id in ids {
        let m = member::member_by_id(pool, id).await?;
        summary.record(member::sync_member_doc(mirror, &m).await?);
    }
    Ok(())
}

async fn sync_resources(
    pool: &SqlitePool,
    mirror: &dyn DocumentStore,
    since: DateTime<Utc>,
    summary: &mut SyncSummary,
) -> Result<()> {
    let ids = resource::resource_ids_updated_since(pool, since).await?;
    info!(count = ids.len(), %since, "Syncing resources");

    for id in ids {
        let r = resource::resource_by_id(pool, id).await?;
        summary.record(resource::sync_resource_doc(mirror, &r).await?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mms_common::db::init_memory_database;
    use mms_common::docstore::SqliteDocumentStore;
    use mms_common::member::insert_row_from_json;
    use mms_common::resource::{insert_resource, Resource};

    #[tokio::test]
    async fn test_backdays_must_be_positive() {
        let pool = init_memory_database().await.unwrap();
        let mirror = SqliteDocumentStore::in_memory().await.unwrap();
        let err = run_sync(&pool, &mirror, Collection::All, 0).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_huge_backdays_is_rejected() {
        let pool = init_memory_database().await.unwrap();
        let mirror = SqliteDocumentStore::in_memory().await.unwrap();
        let err = run_sync(&pool, &mirror, Collection::Members, i64::MAX).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let err = run_sync(&pool, &mirror, Collection::All, 1_000_000_000).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_cutoff_window() {
        let now = time::now();
        assert_eq!(cutoff(now, 2).unwrap(), now - Duration::days(2));
    }

    #[tokio::test]
    async fn test_sync_all_then_rerun_is_unchanged() {
        let pool = init_memory_database().await.unwrap();
        let mirror = SqliteDocumentStore::in_memory().await.unwrap();
        insert_row_from_json(&pool, r#"{"firstName": "Sam", "lastName": "Sync"}"#).await.unwrap();
        let mut r = Resource { name: "Guideline".into(), resource_url: "https://x.org/g".into(), ..Default::default() };
        insert_resource(&pool, &mut r).await.unwrap();

        let first = run_sync(&pool, &mirror, Collection::All, 1).await.unwrap();
        assert_eq!(first, SyncSummary { inserted: 2, replaced: 0, unchanged: 0 });

        let second = run_sync(&pool, &mirror, Collection::Members, 1).await.unwrap();
        assert_eq!(second, SyncSummary { inserted: 0, replaced: 0, unchanged: 1 });
    }

    #[tokio::test]
    async fn test_old_records_are_skipped() {
        let pool = init_memory_database().await.unwrap();
        let mirror = SqliteDocumentStore::in_memory().await.unwrap();
        insert_row_from_json(&pool, r#"{"firstName": "Old", "lastName": "Timer", "updatedAt": "2015-01-01 00:00:00"}"#)
            .await
            .unwrap();

        let summary = run_sync(&pool, &mirror, Collection::Members, 30).await.unwrap();
        assert_eq!(summary.total(), 0);
    }

    #[test]
    fn test_collection_aliases() {
        assert_eq!(Collection::from_str("member", true).unwrap(), Collection::Members);
        assert_eq!(Collection::from_str("resources", true).unwrap(), Collection::Resources);
        assert!(Collection::from_str("modules", true).is_err());
    }
}
