//! Workflow issues
//!
//! An issue may stand alone, be raised against a member, or be raised
//! against a member and one application or invoice.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::association::{self, IssueAssociation};
use crate::error::AssociationError;
use crate::note::{self, Note};
use crate::{Error, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Issue {
    pub id: i64,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub resolved: bool,
    pub visible: bool,
    pub description: String,
    pub action: String,
    pub notes: Vec<Note>,
    pub member_id: Option<i64>,
    #[serde(flatten)]
    pub association: IssueAssociation,
}

/// Sub-category of an issue
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IssueType {
    pub id: i64,
    pub category: IssueCategory,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IssueCategory {
    pub id: i64,
    pub name: String,
    pub description: String,
}

impl Issue {
    /// Decode a submission, reporting association problems as typed errors
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| Error::InvalidInput(format!("Invalid issue: {}", e)))?;
        let member_id = value.get("memberId").and_then(Value::as_i64).unwrap_or(0);
        let has_association = value.get("association").and_then(Value::as_str).is_some_and(|s| !s.is_empty())
            || value.get("associationId").and_then(Value::as_i64).unwrap_or(0) != 0;
        if has_association && member_id == 0 {
            return Err(AssociationError::NoMember.into());
        }
        association::precheck::<IssueAssociation>(&value)?;
        serde_json::from_value(value).map_err(|e| Error::InvalidInput(format!("Invalid issue: {}", e)))
    }

    fn check_insertable(&self) -> Result<()> {
        if self.id > 0 {
            return Err(Error::IdAlreadySet("issue"));
        }
        if self.issue_type.id == 0 {
            return Err(Error::InvalidInput(
                "cannot insert an issue row because type id is not set".into(),
            ));
        }
        if self.description.trim().is_empty() {
            return Err(Error::InvalidInput(
                "cannot insert an issue row because description is empty".into(),
            ));
        }
        if self.association != IssueAssociation::None && self.member_id.unwrap_or(0) == 0 {
            return Err(AssociationError::NoMember.into());
        }
        Ok(())
    }
}

/// Insert an issue and, when a member is set, its association row; sets `issue.id`
pub async fn insert_issue(pool: &SqlitePool, issue: &mut Issue) -> Result<()> {
    issue.check_insertable()?;

    let mut tx = pool.begin().await?;
    let id = sqlx::query(
        "INSERT INTO issue (issue_type_id, resolved, member_visible, description, required_action) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(issue.issue_type.id)
    .bind(issue.resolved)
    .bind(issue.visible)
    .bind(issue.description.trim())
    .bind(&issue.action)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    if let Some(member_id) = issue.member_id.filter(|m| *m > 0) {
        sqlx::query(
            "INSERT INTO issue_association (issue_id, member_id, association, association_entity_id) VALUES (?, ?, ?, ?)",
        )
        .bind(id)
        .bind(member_id)
        .bind(issue.association.entity())
        .bind(issue.association.entity_id())
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    issue.id = id;
    info!(issue_id = id, member_id = ?issue.member_id, association = ?issue.association, "Inserted issue");
    Ok(())
}

/// Load an issue with its type, category, association and notes
pub async fn issue_by_id(pool: &SqlitePool, id: i64) -> Result<Issue> {
    let row = sqlx::query(
        r#"
        SELECT i.id, i.resolved, i.member_visible, i.description, i.required_action,
               ia.member_id, ia.association, ia.association_entity_id,
               it.id AS type_id, it.name AS type_name, it.description AS type_description,
               ic.id AS category_id, ic.name AS category_name, ic.description AS category_description
        FROM issue i
        JOIN issue_type it ON it.id = i.issue_type_id
        JOIN issue_category ic ON ic.id = it.issue_category_id
        LEFT JOIN issue_association ia ON ia.issue_id = i.id
        WHERE i.id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("issue id {}", id)))?;

    Ok(Issue {
        id: row.get("id"),
        issue_type: IssueType {
            id: row.get("type_id"),
            category: IssueCategory {
                id: row.get("category_id"),
                name: row.get("category_name"),
                description: row.get("category_description"),
            },
            name: row.get("type_name"),
            description: row.get("type_description"),
        },
        resolved: row.get("resolved"),
        visible: row.get("member_visible"),
        description: row.get("description"),
        action: row.get("required_action"),
        member_id: row.get("member_id"),
        association: association::from_stored(row.get("association"), row.get("association_entity_id"))?,
        notes: note::notes_by_issue_id(pool, id).await?,
    })
}

/// Ids of unresolved issues raised against a member
pub async fn open_issue_ids_by_member(pool: &SqlitePool, member_id: i64) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar(
        r#"
        SELECT i.id FROM issue i
        JOIN issue_association ia ON ia.issue_id = i.id
        WHERE ia.member_id = ? AND i.resolved = 0
        ORDER BY i.id
        "#,
    )
    .bind(member_id)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{count_rows, init_memory_database};

    fn issue(member_id: Option<i64>, association: IssueAssociation) -> Issue {
        Issue {
            issue_type: IssueType { id: 3, ..Default::default() },
            description: "Invoice unpaid after 60 days".into(),
            member_id,
            association,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_global_issue_has_no_association_row() {
        let pool = init_memory_database().await.unwrap();
        let mut i = issue(None, IssueAssociation::None);
        insert_issue(&pool, &mut i).await.unwrap();

        let read = issue_by_id(&pool, i.id).await.unwrap();
        assert_eq!(read.member_id, None);
        assert_eq!(read.issue_type.category.name, "Finance");
        assert_eq!(count_rows(&pool, "issue_association").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_association_requires_member() {
        let pool = init_memory_database().await.unwrap();
        let mut i = issue(None, IssueAssociation::Invoice(4));
        let err = insert_issue(&pool, &mut i).await.unwrap_err();
        assert!(matches!(err, Error::Association(AssociationError::NoMember)));
        assert_eq!(count_rows(&pool, "issue").await.unwrap(), 0);
    }

    #[test]
    fn test_from_json_checks() {
        let err = Issue::from_json(r#"{"description": "x", "association": "invoice", "associationId": 2}"#)
            .unwrap_err();
        assert!(matches!(err, Error::Association(AssociationError::NoMember)));

        let err = Issue::from_json(r#"{"memberId": 1, "association": "invoice"}"#).unwrap_err();
        assert_eq!(err.to_string(), "association entity ID not specified");

        let err = Issue::from_json(r#"{"memberId": 1, "association": "note", "associationId": 2}"#)
            .unwrap_err();
        assert!(err.to_string().contains("association entity unknown/invalid"));

        let ok = Issue::from_json(r#"{"memberId": 1, "association": "application", "associationId": 2}"#)
            .unwrap();
        assert_eq!(ok.association, IssueAssociation::Application(2));
    }
}
