use std::io;

use crate::error::{Error, Result};
use crate::record::Value;

/// An ordered, flat query result.
///
/// A table is a list of column names and a list of rows, where every row has
/// exactly one value per column. This is the shape every ranking,
/// aggregation, search and profiling query hands back, and it is what the
/// rendering and persistence layers consume.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create an empty table with the given column names.
    pub fn new<I, S>(columns: I) -> Table
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Table {
            columns: columns.into_iter().map(|c| c.into()).collect(),
            rows: vec![],
        }
    }

    /// Add a row to the end of this table.
    ///
    /// This panics if the row does not have exactly one value per column.
    pub fn push(&mut self, row: Vec<Value>) {
        assert_eq!(
            row.len(),
            self.columns.len(),
            "row width must match the number of columns",
        );
        self.rows.push(row);
    }

    /// The column names of this table, in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The rows of this table, in order.
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// The number of rows in this table.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if and only if this table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the position of the named column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Returns the value at the given row in the named column.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let i = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[i])
    }

    /// Returns every value in the named column, in row order.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let i = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r[i]).collect())
    }

    /// Keep only the named columns, in the order given. Names that are not
    /// columns of this table are skipped.
    pub fn select(&self, names: &[&str]) -> Table {
        let idxs: Vec<usize> =
            names.iter().filter_map(|n| self.column_index(n)).collect();
        Table {
            columns: idxs.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|r| idxs.iter().map(|&i| r[i].clone()).collect())
                .collect(),
        }
    }

    /// Prepend a `rank` column numbering the rows 1 through `len()`.
    pub fn insert_rank(&mut self) {
        self.columns.insert(0, "rank".to_string());
        for (i, row) in self.rows.iter_mut().enumerate() {
            row.insert(0, Value::from(i + 1));
        }
    }

    /// Drop every row past the first `n`.
    pub fn truncate(&mut self, n: usize) {
        self.rows.truncate(n);
    }

    /// Write this table as CSV, with a header row. Unknown values are written
    /// as empty fields.
    pub fn write_csv<W: io::Write>(&self, wtr: W) -> Result<()> {
        let mut wtr =
            csv::WriterBuilder::new().has_headers(false).from_writer(wtr);
        wtr.write_record(&self.columns).map_err(Error::csv)?;
        for (i, row) in self.rows.iter().enumerate() {
            if row.len() != self.columns.len() {
                bug!(
                    "row {} has {} values but there are {} columns",
                    i,
                    row.len(),
                    self.columns.len()
                );
            }
            wtr.serialize(row).map_err(Error::csv)?;
        }
        wtr.flush()?;
        Ok(())
    }
}
