//! Membership applications

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::member::reader::opt_date;
use crate::{time, Error, Result};

/// Outcome of an application, stored as -1 / 0 / 1
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    #[default]
    Pending,
    Rejected,
    Accepted,
}

impl ApplicationStatus {
    pub fn from_db(value: i64) -> Self {
        match value {
            1 => Self::Accepted,
            0 => Self::Rejected,
            _ => Self::Pending,
        }
    }

    pub fn to_db(self) -> i64 {
        match self {
            Self::Pending => -1,
            Self::Rejected => 0,
            Self::Accepted => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Rejected => "rejected",
            Self::Accepted => "accepted",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub member_id: i64,
    pub member: String,
    pub nominator_id: Option<i64>,
    pub nominator: String,
    pub seconder_id: Option<i64>,
    pub seconder: String,
    pub date: Option<NaiveDate>,
    #[serde(rename = "for")]
    pub applied_for: String,
    pub status: ApplicationStatus,
    pub comment: String,
}

const SELECT_APPLICATIONS: &str = r#"
SELECT a.id, a.created_at, a.updated_at, a.member_id,
       COALESCE(TRIM(m.first_name || ' ' || m.last_name), '') AS member,
       a.nominator_id,
       COALESCE(TRIM(n.first_name || ' ' || n.last_name), '') AS nominator,
       a.seconder_id,
       COALESCE(TRIM(s.first_name || ' ' || s.last_name), '') AS seconder,
       a.applied_on, COALESCE(t.name, '') AS applied_for, a.result, a.comment
FROM application a
LEFT JOIN member m ON m.id = a.member_id
LEFT JOIN member n ON n.id = a.nominator_id
LEFT JOIN member s ON s.id = a.seconder_id
LEFT JOIN membership_title t ON t.id = a.membership_title_id
"#;

fn application_from_row(r: &SqliteRow) -> Result<Application> {
    Ok(Application {
        id: r.get("id"),
        created_at: time::parse_timestamp(&r.get::<String, _>("created_at"))?,
        updated_at: time::parse_timestamp(&r.get::<String, _>("updated_at"))?,
        member_id: r.get("member_id"),
        member: r.get("member"),
        nominator_id: r.get("nominator_id"),
        nominator: r.get("nominator"),
        seconder_id: r.get("seconder_id"),
        seconder: r.get("seconder"),
        date: opt_date(r.get("applied_on"))?,
        applied_for: r.get("applied_for"),
        status: ApplicationStatus::from_db(r.get("result")),
        comment: r.get("comment"),
    })
}

pub async fn application_by_id(pool: &SqlitePool, id: i64) -> Result<Application> {
    let row = sqlx::query(&format!("{} WHERE a.id = ?", SELECT_APPLICATIONS))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("application id {}", id)))?;
    application_from_row(&row)
}

pub async fn applications_by_member_id(pool: &SqlitePool, member_id: i64) -> Result<Vec<Application>> {
    let rows = sqlx::query(&format!("{} WHERE a.member_id = ? ORDER BY a.id", SELECT_APPLICATIONS))
        .bind(member_id)
        .fetch_all(pool)
        .await?;
    rows.iter().map(application_from_row).collect()
}

/// Applications lodged within an inclusive date range
pub async fn applications_between(
    pool: &SqlitePool,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<Application>> {
    let rows = sqlx::query(&format!(
        "{} WHERE a.applied_on >= ? AND a.applied_on <= ? ORDER BY a.applied_on, a.id",
        SELECT_APPLICATIONS
    ))
    .bind(time::date_to_sql(&from))
    .bind(time::date_to_sql(&to))
    .fetch_all(pool)
    .await?;
    rows.iter().map(application_from_row).collect()
}

pub async fn all_applications(pool: &SqlitePool) -> Result<Vec<Application>> {
    let rows = sqlx::query(&format!("{} ORDER BY a.id", SELECT_APPLICATIONS))
        .fetch_all(pool)
        .await?;
    rows.iter().map(application_from_row).collect()
}

/// Record the outcome of an application
pub async fn set_application_status(
    pool: &SqlitePool,
    id: i64,
    status: ApplicationStatus,
    comment: &str,
) -> Result<()> {
    let result = sqlx::query("UPDATE application SET result = ?, comment = ?, updated_at = ? WHERE id = ?")
        .bind(status.to_db())
        .bind(comment)
        .bind(time::to_sql(&time::now()))
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("application id {}", id)));
    }
    info!(application_id = id, status = status.as_str(), "Application status set");
    Ok(())
}
