//! Member submission, aggregate read-back and mirror sync end to end

use chrono::Duration;
use mms_common::db::{count_rows, init_database, init_memory_database};
use mms_common::docstore::{Filter, SqliteDocumentStore, SyncOutcome};
use mms_common::member::{
    insert_member_row, insert_row_from_json, member_by_id, member_ids, save_member_doc,
    search_member_docs, sync_member_doc, MemberRow,
};
use mms_common::report::member_report;
use sqlx::SqlitePool;

const SUBMISSION: &str = r#"{
    "titleId": 4,
    "countryId": 14,
    "gender": "Male",
    "firstName": "Michael",
    "middleNames": "Peter John",
    "lastName": "Donnici",
    "primaryEmail": "michael@somewhere.com",
    "journalNumber": "J-502",
    "qualifications": [
        {"qualificationId": 1, "year": 1996, "abbreviation": "MBBS"},
        {"qualificationId": 2, "year": 2004, "abbreviation": "FRACP"}
    ],
    "interests": [
        {"specialityId": 5, "preference": 3},
        {"specialityId": 36, "preference": 1},
        {"specialityId": 2, "preference": 2}
    ],
    "positionRows": [{"positionId": 1, "startDate": "2017-01-01"}],
    "accreditationRows": [{"accreditationID": 1, "startDate": "2016-06-30"}],
    "tagRows": [{"tagID": 1}],
    "contactRows": [
        {"contactTypeId": 1, "address1": "PO Box 1", "locality": "Sydney", "state": "NSW", "postcode": "2000", "countryId": 14},
        {"contactTypeId": 2, "address1": "1 Clinic Rd", "locality": "Sydney", "state": "NSW"}
    ],
    "application": {"nominatorId": 0, "forTitleId": 2, "comment": "Applying for ordinary membership"}
}"#;

async fn add_status(pool: &SqlitePool, member_id: i64, status_id: i64) {
    sqlx::query("INSERT INTO member_status (member_id, membership_status_id) VALUES (?, ?)")
        .bind(member_id)
        .bind(status_id)
        .execute(pool)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_insert_then_read_returns_submitted_children() {
    let pool = init_memory_database().await.unwrap();
    let row = insert_row_from_json(&pool, SUBMISSION).await.unwrap();

    let m = member_by_id(&pool, row.id).await.unwrap();
    assert_eq!(m.qualifications.len(), 2);
    assert_eq!(m.specialities.len(), 3);
    assert_eq!(m.positions.len(), 1);
    assert_eq!(m.accreditations.len(), 1);
    assert_eq!(m.tags.len(), 1);
    assert_eq!(m.contact.locations.len(), 2);
    assert_eq!(m.middle_names, vec!["Peter", "John"]);
    assert_eq!(m.gender, "M");
    assert_eq!(m.title, "Dr");
    assert_eq!(count_rows(&pool, "application").await.unwrap(), 1);
}

#[tokio::test]
async fn test_primary_speciality_has_lowest_preference() {
    let pool = init_memory_database().await.unwrap();
    let row = insert_row_from_json(&pool, SUBMISSION).await.unwrap();
    let m = member_by_id(&pool, row.id).await.unwrap();

    let prefs: Vec<i64> = m.specialities.iter().map(|s| s.preference).collect();
    assert_eq!(prefs, vec![1, 2, 3]);
    assert_eq!(m.primary_speciality().unwrap().id, 36);
}

#[tokio::test]
async fn test_current_membership_is_latest_status() {
    let pool = init_memory_database().await.unwrap();
    let row = insert_row_from_json(&pool, SUBMISSION).await.unwrap();
    add_status(&pool, row.id, 1).await;
    add_status(&pool, row.id, 2).await;

    let m = member_by_id(&pool, row.id).await.unwrap();
    assert_eq!(m.memberships.len(), 1);
    assert_eq!(m.memberships[0].status, "Active");
    assert_eq!(m.memberships[0].status_history.len(), 2);
    assert_eq!(m.memberships[0].status_history[1].status, "Applicant");
}

#[tokio::test]
async fn test_failing_child_rolls_back_member() {
    let pool = init_memory_database().await.unwrap();
    let mut row = MemberRow::from_json(SUBMISSION).unwrap();
    row.specialities[2].speciality_id = 999;

    assert!(insert_member_row(&pool, &mut row).await.is_err());
    assert_eq!(row.id, 0);
    for table in ["member", "member_qualification", "member_position", "member_speciality"] {
        assert_eq!(count_rows(&pool, table).await.unwrap(), 0, "{} not rolled back", table);
    }
}

#[tokio::test]
async fn test_mirror_sync_follows_source_updates() {
    let pool = init_memory_database().await.unwrap();
    let store = SqliteDocumentStore::in_memory().await.unwrap();
    let row = insert_row_from_json(&pool, SUBMISSION).await.unwrap();
    let mut m = member_by_id(&pool, row.id).await.unwrap();

    save_member_doc(&store, &m).await.unwrap();
    let docs = search_member_docs(&store, &Filter::new().eq("id", row.id)).await.unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id, row.id);

    m.last_name = "Stale".into();
    m.updated_at = m.updated_at - Duration::minutes(1);
    assert_eq!(sync_member_doc(&store, &m).await.unwrap(), SyncOutcome::Unchanged);

    m.last_name = "Fresh".into();
    m.updated_at = m.updated_at + Duration::minutes(2);
    assert_eq!(sync_member_doc(&store, &m).await.unwrap(), SyncOutcome::Replaced);
    let docs = search_member_docs(&store, &Filter::new().eq("lastName", "Fresh")).await.unwrap();
    assert_eq!(docs, vec![m]);
}

#[tokio::test]
async fn test_file_backed_store_and_report() {
    let dir = tempfile::TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("mms.db")).await.unwrap();
    insert_row_from_json(&pool, SUBMISSION).await.unwrap();
    insert_row_from_json(&pool, SUBMISSION).await.unwrap();

    let mut members = Vec::new();
    for id in member_ids(&pool).await.unwrap() {
        members.push(member_by_id(&pool, id).await.unwrap());
    }
    let sheet = member_report(&members);
    assert_eq!(sheet.row_count(), 2);
    assert!(sheet.rows().iter().all(|r| r.len() == sheet.columns().len()));

    let out = dir.path().join("members.csv");
    sheet.write_csv(std::fs::File::create(&out).unwrap()).unwrap();
    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("Member ID,Prefix,First Name"));
    assert_eq!(text.lines().count(), 3);
}
