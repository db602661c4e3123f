//! Relational store: connection setup, schema and reference data

pub mod init;
pub mod schema;
pub mod seed;

pub use init::*;

/// Map the "unset" integer id used by submissions (0) to SQL NULL
pub(crate) fn nullable_id(id: i64) -> Option<i64> {
    (id > 0).then_some(id)
}

/// Map an empty string to SQL NULL
pub(crate) fn nullable_str(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
