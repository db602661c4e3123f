//! Timestamp utilities
//!
//! The relational store keeps timestamps as `YYYY-MM-DD HH:MM:SS` text, the
//! same form `CURRENT_TIMESTAMP` produces. RFC 3339 is also accepted on read.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::{Error, Result};

const SQL_TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S";
const SQL_DATE: &str = "%Y-%m-%d";

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Parse a stored timestamp (RFC 3339 or SQL `YYYY-MM-DD HH:MM:SS`)
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, SQL_TIMESTAMP)
        .map(|naive| naive.and_utc())
        .map_err(|e| Error::Internal(format!("Failed to parse timestamp {:?}: {}", s, e)))
}

/// Parse a stored calendar date (`YYYY-MM-DD`, a trailing time part is ignored)
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let date_part = s.split_whitespace().next().unwrap_or_default();
    let date_part = date_part.split('T').next().unwrap_or_default();
    NaiveDate::parse_from_str(date_part, SQL_DATE)
        .map_err(|e| Error::Internal(format!("Failed to parse date {:?}: {}", s, e)))
}

/// Format a timestamp the way it is written back to the relational store
pub fn to_sql(dt: &DateTime<Utc>) -> String {
    dt.format(SQL_TIMESTAMP).to_string()
}

/// Format a date as `YYYY-MM-DD`
pub fn date_to_sql(date: &NaiveDate) -> String {
    date.format(SQL_DATE).to_string()
}
