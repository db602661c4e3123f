//! Continuing professional development (CPD) activity records
//!
//! Unlike the member junction rows, CPD entries are edited in place and may
//! be deleted one row at a time by their owning member.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::info;

use crate::{time, Error, Result};

/// A recorded CPD activity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cpd {
    pub id: i64,
    pub member_id: i64,
    pub date: NaiveDate,
    pub activity_id: i64,
    pub activity: String,
    pub type_id: Option<i64>,
    pub type_name: String,
    pub quantity: f64,
    pub unit_credit: f64,
    /// quantity x unit credit
    pub credit: f64,
    pub description: String,
    pub evidence: bool,
}

/// Submitted CPD values for add/update
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CpdInput {
    pub id: i64,
    pub member_id: i64,
    pub activity_id: i64,
    pub type_id: i64,
    pub date: String,
    pub quantity: f64,
    /// Zero means "use the activity's default unit credit"
    pub unit_credit: f64,
    pub description: String,
    pub evidence: bool,
}

/// Optional narrowing for [`query`]; every value is bound as a parameter
#[derive(Debug, Clone, Default)]
pub struct CpdQuery {
    pub member_id: Option<i64>,
    pub activity_id: Option<i64>,
    pub description_contains: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl CpdInput {
    fn validate(&self) -> Result<NaiveDate> {
        if self.member_id == 0 {
            return Err(Error::InvalidInput("CPD member id is not set".into()));
        }
        if self.activity_id == 0 {
            return Err(Error::InvalidInput("CPD activity id is not set".into()));
        }
        if self.quantity < 0.0 || self.unit_credit < 0.0 {
            return Err(Error::InvalidInput("CPD quantity and unit credit cannot be negative".into()));
        }
        time::parse_date(&self.date)
            .map_err(|_| Error::InvalidInput(format!("Invalid CPD date: {:?}", self.date)))
    }
}

const SELECT_CPD: &str = r#"
SELECT ma.id, ma.member_id, ma.activity_on, ma.cpd_activity_id,
       a.name AS activity, ma.cpd_activity_type_id, COALESCE(t.name, '') AS type_name,
       ma.quantity, ma.unit_credit, ma.description, ma.evidence
FROM member_activity ma
JOIN cpd_activity a ON a.id = ma.cpd_activity_id
LEFT JOIN cpd_activity_type t ON t.id = ma.cpd_activity_type_id
"#;

fn cpd_from_row(r: &SqliteRow) -> Result<Cpd> {
    let quantity: f64 = r.get("quantity");
    let unit_credit: f64 = r.get("unit_credit");
    Ok(Cpd {
        id: r.get("id"),
        member_id: r.get("member_id"),
        date: time::parse_date(&r.get::<String, _>("activity_on"))?,
        activity_id: r.get("cpd_activity_id"),
        activity: r.get("activity"),
        type_id: r.get("cpd_activity_type_id"),
        type_name: r.get("type_name"),
        quantity,
        unit_credit,
        credit: quantity * unit_credit,
        description: r.get("description"),
        evidence: r.get("evidence"),
    })
}

async fn resolve_unit_credit(pool: &SqlitePool, input: &CpdInput) -> Result<f64> {
    if input.unit_credit > 0.0 {
        return Ok(input.unit_credit);
    }
    sqlx::query_scalar("SELECT unit_credit FROM cpd_activity WHERE id = ?")
        .bind(input.activity_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::InvalidInput(format!("Unknown CPD activity id {}", input.activity_id)))
}

/// Record a new activity, returning its id
pub async fn add(pool: &SqlitePool, input: &CpdInput) -> Result<i64> {
    if input.id != 0 {
        return Err(Error::IdAlreadySet("cpd"));
    }
    let date = input.validate()?;
    let unit_credit = resolve_unit_credit(pool, input).await?;

    let id = sqlx::query(
        r#"
        INSERT INTO member_activity (
            member_id, cpd_activity_id, cpd_activity_type_id, activity_on,
            quantity, unit_credit, description, evidence
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(input.member_id)
    .bind(input.activity_id)
    .bind(crate::db::nullable_id(input.type_id))
    .bind(time::date_to_sql(&date))
    .bind(input.quantity)
    .bind(unit_credit)
    .bind(input.description.trim())
    .bind(input.evidence)
    .execute(pool)
    .await?
    .last_insert_rowid();

    info!(cpd_id = id, member_id = input.member_id, "Added CPD activity");
    Ok(id)
}

/// Update an existing activity owned by `input.member_id`
pub async fn update(pool: &SqlitePool, input: &CpdInput) -> Result<()> {
    if input.id == 0 {
        return Err(Error::InvalidInput("CPD id is required for update".into()));
    }
    let date = input.validate()?;
    let unit_credit = resolve_unit_credit(pool, input).await?;

    let result = sqlx::query(
        r#"
        UPDATE member_activity
        SET cpd_activity_id = ?, cpd_activity_type_id = ?, activity_on = ?,
            quantity = ?, unit_credit = ?, description = ?, evidence = ?, updated_at = ?
        WHERE id = ? AND member_id = ?
        "#,
    )
    .bind(input.activity_id)
    .bind(crate::db::nullable_id(input.type_id))
    .bind(time::date_to_sql(&date))
    .bind(input.quantity)
    .bind(unit_credit)
    .bind(input.description.trim())
    .bind(input.evidence)
    .bind(time::to_sql(&time::now()))
    .bind(input.id)
    .bind(input.member_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!(
            "cpd id {} for member id {}",
            input.id, input.member_id
        )));
    }
    Ok(())
}

pub async fn by_id(pool: &SqlitePool, id: i64) -> Result<Cpd> {
    let row = sqlx::query(&format!("{} WHERE ma.id = ?", SELECT_CPD))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("cpd id {}", id)))?;
    cpd_from_row(&row)
}

/// A member's activities, most recent first
pub async fn by_member_id(pool: &SqlitePool, member_id: i64) -> Result<Vec<Cpd>> {
    query(
        pool,
        &CpdQuery {
            member_id: Some(member_id),
            ..Default::default()
        },
    )
    .await
}

/// Activities matching every set field of `q`, most recent first
pub async fn query(pool: &SqlitePool, q: &CpdQuery) -> Result<Vec<Cpd>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_CPD);
    qb.push(" WHERE 1 = 1");
    if let Some(member_id) = q.member_id {
        qb.push(" AND ma.member_id = ").push_bind(member_id);
    }
    if let Some(activity_id) = q.activity_id {
        qb.push(" AND ma.cpd_activity_id = ").push_bind(activity_id);
    }
    if let Some(text) = &q.description_contains {
        qb.push(" AND ma.description LIKE ")
            .push_bind(format!("%{}%", text));
    }
    if let Some(from) = q.from {
        qb.push(" AND ma.activity_on >= ").push_bind(time::date_to_sql(&from));
    }
    if let Some(to) = q.to {
        qb.push(" AND ma.activity_on <= ").push_bind(time::date_to_sql(&to));
    }
    qb.push(" ORDER BY ma.activity_on DESC, ma.id DESC");

    let rows = qb.build().fetch_all(pool).await?;
    rows.iter().map(cpd_from_row).collect()
}

/// Id of an existing activity identical to `input`, if any
pub async fn duplicate_of(pool: &SqlitePool, input: &CpdInput) -> Result<Option<i64>> {
    let date = input.validate()?;
    let unit_credit = resolve_unit_credit(pool, input).await?;

    let id = sqlx::query_scalar(
        r#"
        SELECT id FROM member_activity
        WHERE member_id = ? AND cpd_activity_id = ? AND COALESCE(cpd_activity_type_id, 0) = ?
          AND activity_on = ? AND quantity = ? AND unit_credit = ?
          AND description = ? AND evidence = ?
        ORDER BY id
        LIMIT 1
        "#,
    )
    .bind(input.member_id)
    .bind(input.activity_id)
    .bind(input.type_id)
    .bind(time::date_to_sql(&date))
    .bind(input.quantity)
    .bind(unit_credit)
    .bind(input.description.trim())
    .bind(input.evidence)
    .fetch_optional(pool)
    .await?;
    Ok(id)
}

/// Delete one activity, only if it belongs to `member_id`
pub async fn delete(pool: &SqlitePool, member_id: i64, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM member_activity WHERE id = ? AND member_id = ?")
        .bind(id)
        .bind(member_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("cpd id {} for member id {}", id, member_id)));
    }
    info!(cpd_id = id, member_id, "Deleted CPD activity");
    Ok(())
}
