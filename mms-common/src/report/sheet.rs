//! Single-sheet tabular report written as CSV

use std::io::Write;

use chrono::NaiveDate;
use serde::Serialize;

use crate::{time, Error, Result};

/// A typed cell value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Date(NaiveDate),
}

impl Cell {
    /// Text as written to CSV
    pub fn render(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Int(n) => n.to_string(),
            Cell::Float(x) => format!("{:.2}", x),
            Cell::Date(d) => time::date_to_sql(d),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Cell::Int(n)
    }
}

impl From<f64> for Cell {
    fn from(x: f64) -> Self {
        Cell::Float(x)
    }
}

impl From<NaiveDate> for Cell {
    fn from(d: NaiveDate) -> Self {
        Cell::Date(d)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Cell::Empty)
    }
}

/// Problem recorded against a source record while building a sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetError {
    pub record_id: i64,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct Sheet {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
    errors: Vec<SheetError>,
}

impl Sheet {
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            rows: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn errors(&self) -> &[SheetError] {
        &self.errors
    }

    /// Append a data row; its length must equal the column count
    pub fn add_row(&mut self, row: Vec<Cell>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::InvalidInput(format!(
                "number of data items ({}) does not equal the number of columns ({})",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn add_error(&mut self, record_id: i64, message: impl Into<String>) {
        self.errors.push(SheetError {
            record_id,
            message: message.into(),
        });
    }

    /// Add a row, recording a failure as a sheet error instead of returning it
    pub(crate) fn push_row(&mut self, record_id: i64, row: Vec<Cell>) {
        if let Err(e) = self.add_row(row) {
            tracing::warn!(record_id, error = %e, "Report row rejected");
            self.add_error(record_id, e.to_string());
        }
    }

    /// Write headings, data rows, then one row per recorded error
    ///
    /// Error rows carry `error [<id>]: <message>` in the first cell and are
    /// padded to the column count.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut w = csv::Writer::from_writer(writer);
        w.write_record(&self.columns)?;
        for row in &self.rows {
            w.write_record(row.iter().map(Cell::render))?;
        }
        for e in &self.errors {
            let mut record = vec![String::new(); self.columns.len()];
            if let Some(first) = record.first_mut() {
                *first = format!("error [{}]: {}", e.record_id, e.message);
            }
            w.write_record(&record)?;
        }
        w.flush()?;
        Ok(())
    }
}
