//! Member notes
//!
//! A note always belongs to a member and may also be associated with an
//! application or an issue.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::association::{self, NoteAssociation};
use crate::{Error, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Note {
    pub id: i64,
    pub member_id: i64,
    pub type_id: i64,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(flatten)]
    pub association: NoteAssociation,
    pub date_created: String,
    pub date_updated: String,
    pub date_effective: String,
    pub content: String,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Attachment {
    pub id: i64,
    pub name: String,
    pub url: String,
}

impl Note {
    /// Decode a submission, reporting association problems as typed errors
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| Error::InvalidInput(format!("Invalid note: {}", e)))?;
        association::precheck::<NoteAssociation>(&value)?;
        serde_json::from_value(value).map_err(|e| Error::InvalidInput(format!("Invalid note: {}", e)))
    }

    fn check_insertable(&self) -> Result<()> {
        if self.id > 0 {
            return Err(Error::IdAlreadySet("note"));
        }
        if self.member_id == 0 {
            return Err(Error::InvalidInput(
                "cannot insert a note row because member id is not set".into(),
            ));
        }
        if self.type_id == 0 {
            return Err(Error::InvalidInput(
                "cannot insert a note row because type id is not set".into(),
            ));
        }
        if self.content.trim().is_empty() {
            return Err(Error::InvalidInput(
                "cannot insert a note row because content is empty".into(),
            ));
        }
        Ok(())
    }
}

/// Insert a note and its association row in one transaction; sets `note.id`
pub async fn insert_note(pool: &SqlitePool, note: &mut Note) -> Result<()> {
    note.check_insertable()?;

    let mut tx = pool.begin().await?;
    let id = sqlx::query(
        "INSERT INTO note (note_type_id, effective_on, note) VALUES (?, COALESCE(NULLIF(?, ''), CURRENT_TIMESTAMP), ?)",
    )
    .bind(note.type_id)
    .bind(&note.date_effective)
    .bind(&note.content)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    sqlx::query(
        "INSERT INTO note_association (note_id, member_id, association, association_entity_id) VALUES (?, ?, ?, ?)",
    )
    .bind(id)
    .bind(note.member_id)
    .bind(note.association.entity())
    .bind(note.association.entity_id())
    .execute(&mut *tx)
    .await?;

    for attachment in &mut note.attachments {
        attachment.id = sqlx::query("INSERT INTO note_attachment (note_id, name, url) VALUES (?, ?, ?)")
            .bind(id)
            .bind(&attachment.name)
            .bind(&attachment.url)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();
    }
    tx.commit().await?;

    note.id = id;
    info!(note_id = id, member_id = note.member_id, association = ?note.association, "Inserted note");
    Ok(())
}

/// Attach a file reference to an existing note
pub async fn add_attachment(pool: &SqlitePool, note_id: i64, name: &str, url: &str) -> Result<Attachment> {
    if name.trim().is_empty() || url.trim().is_empty() {
        return Err(Error::InvalidInput("attachment name and url are required".into()));
    }
    let id = sqlx::query("INSERT INTO note_attachment (note_id, name, url) VALUES (?, ?, ?)")
        .bind(note_id)
        .bind(name)
        .bind(url)
        .execute(pool)
        .await?
        .last_insert_rowid();
    Ok(Attachment {
        id,
        name: name.to_string(),
        url: url.to_string(),
    })
}

const SELECT_NOTE: &str = r#"
SELECT n.id, n.note_type_id, nt.name AS type_name, na.member_id,
       na.association, na.association_entity_id,
       n.created_at, n.updated_at, n.effective_on, n.note
FROM note n
JOIN note_type nt ON nt.id = n.note_type_id
JOIN note_association na ON na.note_id = n.id
"#;

pub async fn note_by_id(pool: &SqlitePool, id: i64) -> Result<Note> {
    let row = sqlx::query(&format!("{} WHERE n.id = ?", SELECT_NOTE))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("note id {}", id)))?;
    let mut note = note_from_row(&row)?;
    note.attachments = attachments(pool, id).await?;
    Ok(note)
}

/// Notes for a member, most recently effective first
pub async fn notes_by_member_id(pool: &SqlitePool, member_id: i64) -> Result<Vec<Note>> {
    let rows = sqlx::query(&format!(
        "{} WHERE na.member_id = ? ORDER BY n.effective_on DESC, n.id DESC",
        SELECT_NOTE
    ))
    .bind(member_id)
    .fetch_all(pool)
    .await?;
    with_attachments(pool, rows).await
}

/// Notes associated with an issue, oldest first
pub async fn notes_by_issue_id(pool: &SqlitePool, issue_id: i64) -> Result<Vec<Note>> {
    let rows = sqlx::query(&format!(
        "{} WHERE na.association = 'issue' AND na.association_entity_id = ? ORDER BY n.id",
        SELECT_NOTE
    ))
    .bind(issue_id)
    .fetch_all(pool)
    .await?;
    with_attachments(pool, rows).await
}

async fn with_attachments(pool: &SqlitePool, rows: Vec<SqliteRow>) -> Result<Vec<Note>> {
    let mut notes = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut note = note_from_row(row)?;
        note.attachments = attachments(pool, note.id).await?;
        notes.push(note);
    }
    Ok(notes)
}

fn note_from_row(row: &SqliteRow) -> Result<Note> {
    Ok(Note {
        id: row.get("id"),
        member_id: row.get("member_id"),
        type_id: row.get("note_type_id"),
        type_name: row.get("type_name"),
        association: association::from_stored(row.get("association"), row.get("association_entity_id"))?,
        date_created: row.get("created_at"),
        date_updated: row.get("updated_at"),
        date_effective: row.get("effective_on"),
        content: row.get("note"),
        attachments: Vec::new(),
    })
}

async fn attachments(pool: &SqlitePool, note_id: i64) -> Result<Vec<Attachment>> {
    let rows = sqlx::query("SELECT id, name, url FROM note_attachment WHERE note_id = ? ORDER BY id")
        .bind(note_id)
        .fetch_all(pool)
        .await?;
    Ok(rows
        .iter()
        .map(|r| Attachment {
            id: r.get("id"),
            name: r.get("name"),
            url: r.get("url"),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{count_rows, init_memory_database};
    use crate::error::AssociationError;

    async fn pool_with_member() -> SqlitePool {
        let pool = init_memory_database().await.unwrap();
        sqlx::query("INSERT INTO member (first_name, last_name) VALUES ('Jo', 'Bloggs')")
            .execute(&pool)
            .await
            .unwrap();
        pool
    }

    #[tokio::test]
    async fn test_insert_and_read_note() {
        let pool = pool_with_member().await;
        let mut note = Note {
            member_id: 1,
            type_id: 1,
            content: "Called about renewal".into(),
            attachments: vec![Attachment { name: "letter.pdf".into(), url: "https://files/letter.pdf".into(), ..Default::default() }],
            ..Default::default()
        };
        insert_note(&pool, &mut note).await.unwrap();
        assert!(note.id > 0);

        let read = note_by_id(&pool, note.id).await.unwrap();
        assert_eq!(read.type_name, "General");
        assert_eq!(read.association, NoteAssociation::None);
        assert_eq!(read.attachments.len(), 1);
        assert_eq!(notes_by_member_id(&pool, 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_insert_validation() {
        let pool = pool_with_member().await;

        let mut note = Note { id: 3, member_id: 1, type_id: 1, content: "x".into(), ..Default::default() };
        assert!(matches!(insert_note(&pool, &mut note).await, Err(Error::IdAlreadySet("note"))));

        let mut note = Note { member_id: 1, type_id: 1, ..Default::default() };
        assert!(matches!(insert_note(&pool, &mut note).await, Err(Error::InvalidInput(_))));

        let mut note = Note { member_id: 1, content: "x".into(), ..Default::default() };
        assert!(matches!(insert_note(&pool, &mut note).await, Err(Error::InvalidInput(_))));

        assert_eq!(count_rows(&pool, "note").await.unwrap(), 0);
    }

    #[test]
    fn test_from_json_association_errors() {
        let err = Note::from_json(r#"{"memberId": 1, "typeId": 1, "content": "x", "associationId": 5}"#)
            .unwrap_err();
        assert!(matches!(err, Error::Association(AssociationError::NotSpecified)));
        assert_eq!(err.to_string(), "association entity not specified");

        let err = Note::from_json(r#"{"content": "x", "association": "issue"}"#).unwrap_err();
        assert_eq!(err.to_string(), "association entity ID not specified");

        let err = Note::from_json(r#"{"content": "x", "association": "invoice", "associationId": 5}"#)
            .unwrap_err();
        assert!(matches!(err, Error::Association(AssociationError::Unknown(_))));

        let note = Note::from_json(r#"{"content": "x", "association": "issue", "associationId": 5}"#).unwrap();
        assert_eq!(note.association, NoteAssociation::Issue(5));
    }

    #[tokio::test]
    async fn test_add_attachment_requires_fields() {
        let pool = pool_with_member().await;
        let err = add_attachment(&pool, 1, "", "x").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
