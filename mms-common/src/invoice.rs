//! Subscription invoices (read side)

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::member::reader::opt_date;
use crate::{time, Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub member_id: i64,
    pub member: String,
    pub issue_date: Option<NaiveDate>,
    pub last_send_date: Option<DateTime<Utc>>,
    pub due_date: Option<NaiveDate>,
    pub subscription_id: i64,
    pub subscription: String,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub amount: f64,
    pub paid: bool,
    pub comment: String,
}

const SELECT_ACTIVE_INVOICES: &str = r#"
SELECT i.id, i.created_at, i.updated_at, i.member_id,
       COALESCE(TRIM(m.first_name || ' ' || m.last_name), '') AS member,
       i.invoiced_on, i.last_sent_at, i.due_on,
       i.subscription_id, COALESCE(s.name, '') AS subscription,
       i.start_on, i.end_on, i.invoice_total, i.paid, i.comment
FROM invoice i
LEFT JOIN member m ON m.id = i.member_id
LEFT JOIN subscription s ON s.id = i.subscription_id
WHERE i.active = 1
"#;

fn invoice_from_row(r: &SqliteRow) -> Result<Invoice> {
    let last_sent: Option<String> = r.get("last_sent_at");
    Ok(Invoice {
        id: r.get("id"),
        created_at: time::parse_timestamp(&r.get::<String, _>("created_at"))?,
        updated_at: time::parse_timestamp(&r.get::<String, _>("updated_at"))?,
        member_id: r.get("member_id"),
        member: r.get("member"),
        issue_date: opt_date(r.get("invoiced_on"))?,
        last_send_date: last_sent
            .filter(|s| !s.trim().is_empty())
            .map(|s| time::parse_timestamp(&s))
            .transpose()?,
        due_date: opt_date(r.get("due_on"))?,
        subscription_id: r.get("subscription_id"),
        subscription: r.get("subscription"),
        from_date: opt_date(r.get("start_on"))?,
        to_date: opt_date(r.get("end_on"))?,
        amount: r.get("invoice_total"),
        paid: r.get("paid"),
        comment: r.get("comment"),
    })
}

/// Active invoice by id
pub async fn invoice_by_id(pool: &SqlitePool, id: i64) -> Result<Invoice> {
    let row = sqlx::query(&format!("{} AND i.id = ?", SELECT_ACTIVE_INVOICES))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("invoice id {}", id)))?;
    invoice_from_row(&row)
}

/// Active invoices with the given ids, in id order. Unknown ids are skipped.
pub async fn invoices_by_ids(pool: &SqlitePool, ids: &[i64]) -> Result<Vec<Invoice>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_ACTIVE_INVOICES);
    qb.push(" AND i.id IN (");
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") ORDER BY i.id");

    let rows = qb.build().fetch_all(pool).await?;
    rows.iter().map(invoice_from_row).collect()
}

/// Active invoices issued within an inclusive date range
pub async fn invoices_between(pool: &SqlitePool, from: NaiveDate, to: NaiveDate) -> Result<Vec<Invoice>> {
    let rows = sqlx::query(&format!(
        "{} AND i.invoiced_on >= ? AND i.invoiced_on <= ? ORDER BY i.invoiced_on, i.id",
        SELECT_ACTIVE_INVOICES
    ))
    .bind(time::date_to_sql(&from))
    .bind(time::date_to_sql(&to))
    .fetch_all(pool)
    .await?;
    rows.iter().map(invoice_from_row).collect()
}
