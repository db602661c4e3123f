//! Organisations and their child groups

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::{Error, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Organisation {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub phone: String,
    pub fax: String,
    pub email: String,
    pub web: String,
    /// Active child organisations, one level deep
    pub groups: Vec<Organisation>,
}

const SELECT_ACTIVE: &str =
    "SELECT id, code, name, phone, fax, email, web FROM organisation WHERE active = 1";

fn from_row(r: &SqliteRow) -> Organisation {
    Organisation {
        id: r.get("id"),
        code: r.get("code"),
        name: r.get("name"),
        phone: r.get("phone"),
        fax: r.get("fax"),
        email: r.get("email"),
        web: r.get("web"),
        groups: Vec::new(),
    }
}

/// Active organisation with its active child groups
pub async fn organisation_by_id(pool: &SqlitePool, id: i64) -> Result<Organisation> {
    let row = sqlx::query(&format!("{} AND id = ?", SELECT_ACTIVE))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("organisation id {}", id)))?;
    let mut org = from_row(&row);
    org.groups = children(pool, id).await?;
    Ok(org)
}

/// All active top-level organisations, each with its groups
pub async fn all_organisations(pool: &SqlitePool) -> Result<Vec<Organisation>> {
    let rows = sqlx::query(&format!("{} AND parent_id IS NULL ORDER BY id", SELECT_ACTIVE))
        .fetch_all(pool)
        .await?;

    let mut orgs = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut org = from_row(row);
        org.groups = children(pool, org.id).await?;
        orgs.push(org);
    }
    Ok(orgs)
}

/// Active organisations of one type, without groups
pub async fn organisations_by_type(pool: &SqlitePool, type_id: i64) -> Result<Vec<Organisation>> {
    let rows = sqlx::query(&format!("{} AND type_id = ? ORDER BY id", SELECT_ACTIVE))
        .bind(type_id)
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(from_row).collect())
}

async fn children(pool: &SqlitePool, parent_id: i64) -> Result<Vec<Organisation>> {
    let rows = sqlx::query(&format!("{} AND parent_id = ? ORDER BY id", SELECT_ACTIVE))
        .bind(parent_id)
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(from_row).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_database;

    async fn seeded() -> SqlitePool {
        let pool = init_memory_database().await.unwrap();
        sqlx::query(
            r#"
            INSERT INTO organisation (id, parent_id, type_id, code, name, active) VALUES
                (1, NULL, 1, 'ABC', 'ABC Organisation', 1),
                (2, NULL, 2, 'DEF', 'DEF Organisation', 1),
                (3, 1, 1, 'ABC-1', 'ABC Sub1', 1),
                (4, 1, 1, 'ABC-2', 'ABC Sub2', 1),
                (5, 1, 1, 'ABC-3', 'ABC Sub3', 1),
                (6, 1, 1, 'ABC-4', 'ABC Sub4 (closed)', 0)
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();
        pool
    }

    #[tokio::test]
    async fn test_organisation_with_groups() {
        let pool = seeded().await;
        let org = organisation_by_id(&pool, 1).await.unwrap();

        let expected = Organisation {
            id: 1,
            code: "ABC".into(),
            name: "ABC Organisation".into(),
            groups: vec![
                Organisation { id: 3, code: "ABC-1".into(), name: "ABC Sub1".into(), ..Default::default() },
                Organisation { id: 4, code: "ABC-2".into(), name: "ABC Sub2".into(), ..Default::default() },
                Organisation { id: 5, code: "ABC-3".into(), name: "ABC Sub3".into(), ..Default::default() },
            ],
            ..Default::default()
        };
        assert_eq!(org, expected);
    }

    #[tokio::test]
    async fn test_all_returns_parents_only() {
        let pool = seeded().await;
        let all = all_organisations(&pool).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].groups.len(), 3);
        assert!(all[1].groups.is_empty());
        assert_eq!(organisations_by_type(&pool, 2).await.unwrap().len(), 1);
        assert!(organisation_by_id(&pool, 6).await.unwrap_err().is_not_found());
    }
}
