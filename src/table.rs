//! Column-addressable view of the scraped rows, keyed by a parsed date column

use chrono::NaiveDate;

use crate::types::{Cell, MarketRecord, HEADERS};

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    dates: Vec<NaiveDate>,
    date_indexed: bool,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Build from normalized records. With `date_indexed` the date becomes the
    /// row index and is dropped from the columns.
    pub fn from_records(records: &[MarketRecord], date_indexed: bool) -> Self {
        let skip = usize::from(date_indexed);
        let columns = HEADERS[skip..].iter().map(|h| h.to_string()).collect();
        let dates = records.iter().map(|r| r.date).collect();
        let rows = records
            .iter()
            .map(|r| r.cells().into_iter().skip(skip).collect())
            .collect();

        Table {
            columns,
            dates,
            date_indexed,
            rows,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_date_indexed(&self) -> bool {
        self.date_indexed
    }

    /// Parsed date of every row, whether or not it is the index
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn index(&self) -> Option<&[NaiveDate]> {
        self.date_indexed.then_some(self.dates.as_slice())
    }

    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    pub fn row(&self, i: usize) -> Option<&[Cell]> {
        self.rows.get(i).map(Vec::as_slice)
    }

    /// All rows dated `date`
    pub fn rows_for(&self, date: NaiveDate) -> Vec<&[Cell]> {
        self.dates
            .iter()
            .zip(&self.rows)
            .filter(|(d, _)| **d == date)
            .map(|(_, row)| row.as_slice())
            .collect()
    }
}
