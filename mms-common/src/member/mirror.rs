//! Member documents in the document store
//!
//! Each member is mirrored as its full aggregate under `member::<id>` in the
//! `members` collection.

use tracing::info;

use super::{doc_key, Member};
use crate::docstore::{decode_all, sync_document, DocumentStore, Filter, SyncOutcome, MEMBERS};
use crate::Result;

/// Write the member document, replacing any stored copy
pub async fn save_member_doc(store: &dyn DocumentStore, member: &Member) -> Result<()> {
    let doc = serde_json::to_value(member)?;
    store.upsert(MEMBERS, &doc_key(member.id), &doc).await?;
    info!(member_id = member.id, "Saved member document");
    Ok(())
}

/// Insert the member document when absent, replace it when `member` is newer
pub async fn sync_member_doc(store: &dyn DocumentStore, member: &Member) -> Result<SyncOutcome> {
    let outcome = sync_document(store, MEMBERS, &doc_key(member.id), member, |m: &Member| {
        m.updated_at
    })
    .await?;
    info!(member_id = member.id, ?outcome, "Synced member document");
    Ok(outcome)
}

/// Member documents matching the filter
pub async fn search_member_docs(store: &dyn DocumentStore, filter: &Filter) -> Result<Vec<Member>> {
    decode_all(store.find(MEMBERS, filter).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docstore::SqliteDocumentStore;
    use chrono::{Duration, TimeZone, Utc};

    fn member(updated_minutes: i64, last_name: &str) -> Member {
        let t0 = Utc.with_ymd_and_hms(2019, 3, 1, 9, 0, 0).unwrap();
        Member {
            id: 1,
            first_name: "Michael".into(),
            last_name: last_name.into(),
            updated_at: t0 + Duration::minutes(updated_minutes),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_save_then_query_by_key() {
        let store = SqliteDocumentStore::in_memory().await.unwrap();
        save_member_doc(&store, &member(0, "Donnici")).await.unwrap();

        let found = search_member_docs(&store, &Filter::new().eq("id", 1)).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 1);
    }

    #[tokio::test]
    async fn test_sync_is_timestamp_guarded() {
        let store = SqliteDocumentStore::in_memory().await.unwrap();
        assert_eq!(
            sync_member_doc(&store, &member(0, "Donnici")).await.unwrap(),
            SyncOutcome::Inserted
        );

        let older = member(-1, "Older");
        assert_eq!(sync_member_doc(&store, &older).await.unwrap(), SyncOutcome::Unchanged);
        let stored = search_member_docs(&store, &Filter::new()).await.unwrap();
        assert_eq!(stored[0].last_name, "Donnici");

        let newer = member(1, "Newer");
        assert_eq!(sync_member_doc(&store, &newer).await.unwrap(), SyncOutcome::Replaced);
        let stored = search_member_docs(&store, &Filter::new()).await.unwrap();
        assert_eq!(stored[0], newer);
    }

    #[tokio::test]
    async fn test_sync_equal_timestamp_is_unchanged() {
        let store = SqliteDocumentStore::in_memory().await.unwrap();
        sync_member_doc(&store, &member(0, "A")).await.unwrap();
        assert_eq!(
            sync_member_doc(&store, &member(0, "B")).await.unwrap(),
            SyncOutcome::Unchanged
        );
    }
}
