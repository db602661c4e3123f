//! Member positions as a flat listing across all members

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::member::reader::opt_date;
use crate::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemberPosition {
    pub member_position_id: i64,
    pub member_id: i64,
    pub member: String,
    pub email: String,
    pub position_id: i64,
    pub name: String,
    pub organisation_id: Option<i64>,
    pub organisation_name: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub comment: String,
}

const SELECT_ACTIVE_POSITIONS: &str = r#"
SELECT mp.id, mp.member_id,
       COALESCE(TRIM(m.first_name || ' ' || m.last_name), '') AS member,
       COALESCE(m.primary_email, '') AS email,
       mp.position_id, p.name, mp.organisation_id,
       COALESCE(o.name, '') AS organisation_name,
       mp.start_on, mp.end_on, mp.comment
FROM member_position mp
LEFT JOIN member m ON m.id = mp.member_id
LEFT JOIN position p ON p.id = mp.position_id
LEFT JOIN organisation o ON o.id = mp.organisation_id
WHERE mp.active = 1
"#;

fn from_row(r: &SqliteRow) -> Result<MemberPosition> {
    Ok(MemberPosition {
        member_position_id: r.get("id"),
        member_id: r.get("member_id"),
        member: r.get("member"),
        email: r.get("email"),
        position_id: r.get("position_id"),
        name: r.get("name"),
        organisation_id: r.get("organisation_id"),
        organisation_name: r.get("organisation_name"),
        start: opt_date(r.get("start_on"))?,
        end: opt_date(r.get("end_on"))?,
        comment: r.get("comment"),
    })
}

pub async fn active_positions(pool: &SqlitePool) -> Result<Vec<MemberPosition>> {
    let rows = sqlx::query(&format!("{} ORDER BY mp.id", SELECT_ACTIVE_POSITIONS))
        .fetch_all(pool)
        .await?;
    rows.iter().map(from_row).collect()
}

/// Active holders of one position
pub async fn active_positions_by_position_id(
    pool: &SqlitePool,
    position_id: i64,
) -> Result<Vec<MemberPosition>> {
    let rows = sqlx::query(&format!("{} AND mp.position_id = ? ORDER BY mp.id", SELECT_ACTIVE_POSITIONS))
        .bind(position_id)
        .fetch_all(pool)
        .await?;
    rows.iter().map(from_row).collect()
}

pub async fn member_position_by_id(pool: &SqlitePool, id: i64) -> Result<MemberPosition> {
    let row = sqlx::query(&format!("{} AND mp.id = ?", SELECT_ACTIVE_POSITIONS))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("member position id {}", id)))?;
    from_row(&row)
}
