//! Migration of members and resources into an external document database
//!
//! Records are walked one id at a time, mapped to their target document
//! shape and upserted. A failing record is logged and skipped.
//!
//! Export documents live in their own collections. The mirror's `members`
//! and `resources` collections hold full aggregates, and the two shapes do
//! not decode as each other.

use chrono::{DateTime, NaiveDate, Utc};
use mms_common::docstore::DocumentStore;
use mms_common::member::{self, Location, Member};
use mms_common::resource::{self, Resource};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{error, info};

pub const EXPORTED_MEMBERS: &str = "exported_members";
pub const EXPORTED_RESOURCES: &str = "exported_resources";

/// Member as exported to the external document database
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemberDoc {
    #[serde(rename = "type")]
    pub doc_type: String,
    pub id: i64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub active: bool,
    pub title: String,
    pub first_name: String,
    pub middle_names: Vec<String>,
    pub last_name: String,
    pub post_nominal: String,
    pub gender: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    pub email: String,
    pub mobile: String,
    pub country: String,
    pub membership: MembershipDoc,
    pub locations: Vec<Location>,
    pub qualifications: Vec<String>,
    pub positions: Vec<PositionDoc>,
    pub specialities: Vec<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MembershipDoc {
    pub title: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PositionDoc {
    pub name: String,
    pub organisation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
}

impl From<&Member> for MemberDoc {
    fn from(m: &Member) -> Self {
        MemberDoc {
            doc_type: "member".into(),
            id: m.id,
            created: m.created_at,
            updated: m.updated_at,
            active: m.active,
            title: m.title.clone(),
            first_name: m.first_name.clone(),
            middle_names: m.middle_names.clone(),
            last_name: m.last_name.clone(),
            post_nominal: m.post_nominal.clone(),
            gender: m.gender.clone(),
            date_of_birth: m.date_of_birth,
            email: m.contact.email_primary.clone(),
            mobile: m.contact.mobile.clone(),
            country: m.country.clone(),
            membership: MembershipDoc {
                title: m.current_title().to_string(),
                status: m.current_status().to_string(),
            },
            locations: m.contact.locations.clone(),
            qualifications: m
                .qualifications
                .iter()
                .map(|q| if q.abbreviation.is_empty() { q.name.clone() } else { q.abbreviation.clone() })
                .collect(),
            positions: m
                .positions
                .iter()
                .map(|p| PositionDoc {
                    name: p.name.clone(),
                    organisation: p.organisation_name.clone(),
                    start: p.start,
                    end: p.end,
                })
                .collect(),
            specialities: m.specialities.iter().map(|s| s.name.clone()).collect(),
            tags: m.tags.iter().map(|t| t.name.clone()).collect(),
        }
    }
}

/// Resource as exported to the external document database
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceDoc {
    #[serde(rename = "type")]
    pub doc_type: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    /// `YYYY-MM-DD`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub category: String,
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub keywords: Vec<String>,
    pub url: String,
}

impl From<&Resource> for ResourceDoc {
    fn from(r: &Resource) -> Self {
        ResourceDoc {
            doc_type: "resource".into(),
            created: r.created_at,
            updated: r.updated_at,
            date: r.published_on.map(|d| d.format("%Y-%m-%d").to_string()),
            category: r.resource_type.clone(),
            title: r.name.clone(),
            description: r.description.clone(),
            keywords: r.keywords.clone(),
            url: r.resource_url.clone(),
        }
    }
}

/// Counts for one export walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    pub processed: usize,
    pub written: usize,
    pub failed: usize,
}

/// Export every member, or only the listed ids
pub async fn export_members(pool: &SqlitePool, target: &dyn DocumentStore, ids: Option<&[i64]>) -> mms_common::Result<ExportSummary> {
    let ids = match ids {
        Some(ids) => ids.to_vec(),
        None => member::member_ids(pool).await?,
    };
    info!(count = ids.len(), "Exporting members");

    let mut summary = ExportSummary::default();
    for id in ids {
        summary.processed += 1;
        match export_member(pool, target, id).await {
            Ok(()) => summary.written += 1,
            Err(e) => {
                error!(member_id = id, error = %e, "Member export failed");
                summary.failed += 1;
            }
        }
    }

    info!(?summary, "Member export finished");
    Ok(summary)
}

/// Export every active resource, or only the listed ids
pub async fn export_resources(pool: &SqlitePool, target: &dyn DocumentStore, ids: Option<&[i64]>) -> mms_common::Result<ExportSummary> {
    let ids = match ids {
        Some(ids) => ids.to_vec(),
        None => resource::resource_ids(pool).await?,
    };
    info!(count = ids.len(), "Exporting resources");

    let mut summary = ExportSummary::default();
    for id in ids {
        summary.processed += 1;
        match export_resource(pool, target, id).await {
            Ok(()) => summary.written += 1,
            Err(e) => {
                error!(resource_id = id, error = %e, "Resource export failed");
                summary.failed += 1;
            }
        }
    }

    info!(?summary, "Resource export finished");
    Ok(summary)
}

async fn export_member(pool: &SqlitePool, target: &dyn DocumentStore, id: i64) -> mms_common::Result<()> {
    let m = member::member_by_id(pool, id).await?;
    let doc = serde_json::to_value(MemberDoc::from(&m))?;
    target.upsert(EXPORTED_MEMBERS, &member::doc_key(id), &doc).await
}

async fn export_resource(pool: &SqlitePool, target: &dyn DocumentStore, id: i64) -> mms_common::Result<()> {
    let r = resource::resource_by_id(pool, id).await?;
    let doc = serde_json::to_value(ResourceDoc::from(&r))?;
    target.upsert(EXPORTED_RESOURCES, &resource::doc_key(id), &doc).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use mms_common::db::init_memory_database;
    use mms_common::docstore::{Filter, SqliteDocumentStore, SyncOutcome, MEMBERS};
    use mms_common::member::{insert_row_from_json, save_member_doc, search_member_docs, sync_member_doc};
    use serde_json::json;

    #[tokio::test]
    async fn test_export_continues_past_missing_member() {
        let pool = init_memory_database().await.unwrap();
        let target = SqliteDocumentStore::in_memory().await.unwrap();
        let row = insert_row_from_json(&pool, r#"{"firstName": "Ann", "lastName": "Ames", "tagRows": [{"tagID": 3}]}"#)
            .await
            .unwrap();

        let ids = [row.id, 999];
        let summary = export_members(&pool, &target, Some(&ids)).await.unwrap();
        assert_eq!(summary, ExportSummary { processed: 2, written: 1, failed: 1 });

        let docs = target.find(EXPORTED_MEMBERS, &Filter::new().eq("tags", "Life Member")).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["type"], "member");
        assert_eq!(docs[0]["lastName"], "Ames");
    }

    #[test]
    fn test_resource_doc_shape() {
        let r = Resource {
            id: 6576,
            resource_type: "Journal Article".into(),
            name: "Gut microbiome".into(),
            resource_url: "https://doi.org/10.1053/j.gastro.2017.08.022".into(),
            published_on: NaiveDate::from_ymd_opt(2017, 8, 22),
            ..Default::default()
        };
        let doc = serde_json::to_value(ResourceDoc::from(&r)).unwrap();
        assert_eq!(doc["type"], "resource");
        assert_eq!(doc["date"], "2017-08-22");
        assert_eq!(doc["category"], "Journal Article");
        assert_eq!(doc["url"], json!("https://doi.org/10.1053/j.gastro.2017.08.022"));
        assert!(doc.get("keywords").is_none());
        assert!(doc.get("description").is_none());
    }

    #[tokio::test]
    async fn test_export_resources_writes_every_active_resource() {
        let pool = init_memory_database().await.unwrap();
        let target = SqliteDocumentStore::in_memory().await.unwrap();
        for url in ["https://x.org/1", "https://x.org/2"] {
            let mut r = Resource { name: "R".into(), resource_url: url.into(), ..Default::default() };
            resource::insert_resource(&pool, &mut r).await.unwrap();
        }

        let summary = export_resources(&pool, &target, None).await.unwrap();
        assert_eq!(summary.written, 2);
        assert!(target.get(EXPORTED_RESOURCES, "resource::2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_export_into_mirror_leaves_member_docs_readable() {
        let pool = init_memory_database().await.unwrap();
        let mirror = SqliteDocumentStore::in_memory().await.unwrap();
        let row = insert_row_from_json(
            &pool,
            r#"{"firstName": "Mira", "lastName": "Mirror", "qualifications": [{"qualificationId": 1, "year": 1996}]}"#,
        )
        .await
        .unwrap();
        let mut m = member::member_by_id(&pool, row.id).await.unwrap();
        save_member_doc(&mirror, &m).await.unwrap();

        let summary = export_members(&pool, &mirror, None).await.unwrap();
        assert_eq!(summary.failed, 0);

        let found = search_member_docs(&mirror, &Filter::new()).await.unwrap();
        assert_eq!(found, vec![m.clone()]);
        assert!(mirror.get(MEMBERS, &member::doc_key(row.id)).await.unwrap().is_some());

        m.updated_at += chrono::Duration::minutes(1);
        assert_eq!(sync_member_doc(&mirror, &m).await.unwrap(), SyncOutcome::Replaced);
    }
}
