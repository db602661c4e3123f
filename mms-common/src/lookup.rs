//! Reference lists (qualifications, specialities, tags, ...)

use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use crate::Result;

/// An entry of a reference list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LookupItem {
    pub id: i64,
    pub name: String,
}

/// Reference tables exposed as lists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Qualifications,
    Specialities,
    Positions,
    Accreditations,
    Tags,
    Countries,
    NamePrefixes,
    ContactTypes,
    MembershipTitles,
    MembershipStatuses,
}

impl Lookup {
    pub const ALL: [Lookup; 10] = [
        Lookup::Qualifications,
        Lookup::Specialities,
        Lookup::Positions,
        Lookup::Accreditations,
        Lookup::Tags,
        Lookup::Countries,
        Lookup::NamePrefixes,
        Lookup::ContactTypes,
        Lookup::MembershipTitles,
        Lookup::MembershipStatuses,
    ];

    fn table(self) -> &'static str {
        match self {
            Lookup::Qualifications => "qualification",
            Lookup::Specialities => "speciality",
            Lookup::Positions => "position",
            Lookup::Accreditations => "accreditation",
            Lookup::Tags => "tag",
            Lookup::Countries => "country",
            Lookup::NamePrefixes => "name_prefix",
            Lookup::ContactTypes => "contact_type",
            Lookup::MembershipTitles => "membership_title",
            Lookup::MembershipStatuses => "membership_status",
        }
    }
}

/// Every entry of a reference list, sorted by name
pub async fn list(pool: &SqlitePool, lookup: Lookup) -> Result<Vec<LookupItem>> {
    let rows = sqlx::query(&format!(
        "SELECT id, name FROM {} ORDER BY name, id",
        lookup.table()
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows
        .iter()
        .map(|r| LookupItem {
            id: r.get("id"),
            name: r.get("name"),
        })
        .collect())
}

/// Id of the entry with this name (case-insensitive)
pub async fn id_by_name(pool: &SqlitePool, lookup: Lookup, name: &str) -> Result<Option<i64>> {
    let id = sqlx::query_scalar(&format!(
        "SELECT id FROM {} WHERE name = ? COLLATE NOCASE ORDER BY id LIMIT 1",
        lookup.table()
    ))
    .bind(name.trim())
    .fetch_optional(pool)
    .await?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_database;

    #[tokio::test]
    async fn test_every_list_is_seeded() {
        let pool = init_memory_database().await.unwrap();
        for lookup in Lookup::ALL {
            assert!(!list(&pool, lookup).await.unwrap().is_empty(), "{:?} is empty", lookup);
        }
    }

    #[tokio::test]
    async fn test_id_by_name() {
        let pool = init_memory_database().await.unwrap();
        assert_eq!(id_by_name(&pool, Lookup::Tags, "advanced trainee").await.unwrap(), Some(4));
        assert_eq!(id_by_name(&pool, Lookup::Countries, "Atlantis").await.unwrap(), None);
    }
}
