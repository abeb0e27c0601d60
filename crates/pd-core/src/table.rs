//! Rows plus column names

use crate::row::Row;
use std::fmt;

/// A materialized query result.
///
/// Backends fill `columns` during execute, before appending any rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_columns(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn set_columns(&mut self, columns: Vec<String>) {
        self.columns = columns;
    }

    pub fn push_column(&mut self, name: impl Into<String>) {
        self.columns.push(name.into());
    }

    pub fn push_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_name(&self, column: usize) -> Option<&str> {
        self.columns.get(column).map(String::as_str)
    }

    /// Position of the first column called `name`
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Drop all rows, keeping the column names
    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Split into column names and rows
    pub fn into_parts(self) -> (Vec<String>, Vec<Row>) {
        (self.columns, self.rows)
    }

    /// Render as a JSON array of objects keyed by column name.
    ///
    /// Cells without a column name are keyed by their position.
    pub fn to_json(&self) -> serde_json::Value {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let object: serde_json::Map<String, serde_json::Value> = row
                    .iter()
                    .enumerate()
                    .map(|(i, cell)| {
                        let key = self
                            .column_name(i)
                            .map_or_else(|| i.to_string(), str::to_string);
                        (key, cell.to_json())
                    })
                    .collect();
                serde_json::Value::Object(object)
            })
            .collect();
        serde_json::Value::Array(rows)
    }
}

impl fmt::Display for Table {
    /// Plain pipe-separated rendering, header first
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.columns.join(" | "))?;
        for row in &self.rows {
            let line: Vec<String> = row.iter().map(ToString::to_string).collect();
            writeln!(f, "{}", line.join(" | "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "table_test.rs"]
mod tests;
