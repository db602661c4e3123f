//! Spreadsheet-style reports
//!
//! Each report builds a [`Sheet`] from records that have already been
//! fetched. Reports needing extra member detail take a pool and look each
//! member up; a failed lookup is recorded on the sheet and the row is still
//! written.

mod application;
mod invoice;
mod member;
mod position;
pub mod sheet;

pub use application::{application_report, APPLICATION_COLUMNS};
pub use invoice::{invoice_report, INVOICE_COLUMNS};
pub use member::{journal_report, member_report, JOURNAL_COLUMNS, MEMBER_COLUMNS};
pub use position::{position_report, POSITION_COLUMNS};
pub use sheet::{Cell, Sheet, SheetError};

/// `"<name> [<id>]"`, the way reports label a linked record
pub(crate) fn labelled(name: &str, id: i64) -> String {
    format!("{} [{}]", name, id)
}
