//! Report generation to CSV files

use chrono::NaiveDate;
use clap::ValueEnum;
use mms_common::report::{self, Sheet};
use mms_common::{application, invoice, member, position, Result};
use sqlx::SqlitePool;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportKind {
    Members,
    Journal,
    Applications,
    Invoices,
    Positions,
}

impl ReportKind {
    pub fn file_name(self) -> &'static str {
        match self {
            ReportKind::Members => "members.csv",
            ReportKind::Journal => "journal.csv",
            ReportKind::Applications => "applications.csv",
            ReportKind::Invoices => "invoices.csv",
            ReportKind::Positions => "positions.csv",
        }
    }
}

/// Inclusive date range for applications and invoices; open when unset
#[derive(Debug, Clone, Copy, Default)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    fn bounds(&self) -> (NaiveDate, NaiveDate) {
        // Stored dates are compared as YYYY-MM-DD text, so stay within four-digit years
        let earliest = NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or_default();
        let latest = NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or_default();
        (self.from.unwrap_or(earliest), self.to.unwrap_or(latest))
    }
}

/// Build one report sheet from the relational store
pub async fn build_report(pool: &SqlitePool, kind: ReportKind, range: DateRange) -> Result<Sheet> {
    let sheet = match kind {
        ReportKind::Members | ReportKind::Journal => {
            let ids = member::member_ids(pool).await?;
            let mut members = Vec::with_capacity(ids.len());
            let mut unreadable = Vec::new();
            for id in ids {
                match member::member_by_id(pool, id).await {
                    Ok(m) => members.push(m),
                    Err(e) => {
                        error!(member_id = id, error = %e, "Could not read member for report");
                        unreadable.push((id, e.to_string()));
                    }
                }
            }
            let mut sheet = if kind == ReportKind::Members {
                report::member_report(&members)
            } else {
                report::journal_report(&members)
            };
            for (id, message) in unreadable {
                sheet.add_error(id, message);
            }
            sheet
        }
        ReportKind::Applications => {
            let (from, to) = range.bounds();
            let applications = application::applications_between(pool, from, to).await?;
            report::application_report(pool, &applications).await
        }
        ReportKind::Invoices => {
            let (from, to) = range.bounds();
            report::invoice_report(&invoice::invoices_between(pool, from, to).await?)
        }
        ReportKind::Positions => {
            let positions = position::active_positions(pool).await?;
            report::position_report(pool, &positions).await
        }
    };

    if !sheet.errors().is_empty() {
        warn!(report = ?kind, errors = sheet.errors().len(), "Report built with errors");
    }
    Ok(sheet)
}

/// Build a report and write it as `<out_dir>/<kind>.csv`
pub async fn write_report(pool: &SqlitePool, kind: ReportKind, range: DateRange, out_dir: &Path) -> Result<PathBuf> {
    let sheet = build_report(pool, kind, range).await?;

    std::fs::create_dir_all(out_dir)?;
    let path = out_dir.join(kind.file_name());
    sheet.write_csv(BufWriter::new(File::create(&path)?))?;

    info!(report = ?kind, rows = sheet.row_count(), path = %path.display(), "Report written");
    Ok(path)
}
