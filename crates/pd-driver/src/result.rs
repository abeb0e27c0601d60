//! Query results and row iteration

use crate::backend::FetchMode;
use crate::error::{DbError, DbResult};
use crate::statement::Statement;
use pd_core::{Row, Table};
use std::fmt;

enum Source<'a> {
    Borrowed(&'a mut Statement),
    Owned(Box<Statement>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    NotStarted,
    Active,
    Exhausted,
}

/// Outcome of executing a [`Statement`].
///
/// Rows are pulled with [`fetch`](QueryResult::fetch) or by iterating. In batch
/// mode they come from the table the backend filled during execution; in
/// streaming mode each one is requested from the backend. Dropping the result
/// rewinds the statement but keeps its bindings.
pub struct QueryResult<'a> {
    source: Source<'a>,
    columns: Vec<String>,
    pending: std::vec::IntoIter<Row>,
    mode: FetchMode,
    cursor: Cursor,
}

impl<'a> QueryResult<'a> {
    pub(crate) fn borrowed(statement: &'a mut Statement, table: Table) -> Self {
        Self::new(Source::Borrowed(statement), table)
    }

    fn new(mut source: Source<'a>, table: Table) -> Self {
        let mode = match &mut source {
            Source::Borrowed(statement) => statement.fetch_mode(),
            Source::Owned(statement) => statement.fetch_mode(),
        };
        let (columns, rows) = table.into_parts();
        Self {
            source,
            columns,
            pending: rows.into_iter(),
            mode,
            cursor: Cursor::NotStarted,
        }
    }

    fn statement_mut(&mut self) -> &mut Statement {
        match &mut self.source {
            Source::Borrowed(statement) => &mut **statement,
            Source::Owned(statement) => &mut **statement,
        }
    }

    /// The statement that produced this result
    pub fn statement(&self) -> &Statement {
        match &self.source {
            Source::Borrowed(statement) => &**statement,
            Source::Owned(statement) => &**statement,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn fetch_mode(&self) -> FetchMode {
        self.mode
    }

    /// Next row, or `None` once the result is exhausted
    pub fn fetch(&mut self) -> DbResult<Option<Row>> {
        if self.cursor == Cursor::Exhausted {
            return Ok(None);
        }
        self.cursor = Cursor::Active;

        let next = match self.mode {
            FetchMode::Batch => self.pending.next(),
            FetchMode::Streaming => match self.statement_mut().fetch_row() {
                Ok(row) => row,
                Err(e) => {
                    self.cursor = Cursor::Exhausted;
                    return Err(e);
                }
            },
        };

        if next.is_none() {
            self.cursor = Cursor::Exhausted;
        }
        Ok(next)
    }

    /// Collect every row into a [`Table`].
    ///
    /// Only valid before the first [`fetch`](Self::fetch); afterwards some rows
    /// would silently be missing, so it fails with [`DbError::FetchOrder`].
    pub fn fetch_all(&mut self) -> DbResult<Table> {
        if self.cursor != Cursor::NotStarted {
            return Err(DbError::FetchOrder);
        }
        let mut table = Table::with_columns(self.columns.clone());
        while let Some(row) = self.fetch()? {
            table.push_row(row);
        }
        Ok(table)
    }

    /// Most recent diagnostic from the backend statement
    pub fn error_message(&self) -> String {
        self.statement().error_message()
    }
}

impl QueryResult<'static> {
    pub(crate) fn owned(statement: Box<Statement>, table: Table) -> Self {
        Self::new(Source::Owned(statement), table)
    }
}

impl Iterator for QueryResult<'_> {
    type Item = DbResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.fetch().transpose()
    }
}

impl Drop for QueryResult<'_> {
    fn drop(&mut self) {
        self.statement_mut().rewind();
    }
}

impl fmt::Debug for QueryResult<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryResult")
            .field("columns", &self.columns)
            .field("mode", &self.mode)
            .field("cursor", &self.cursor)
            .finish()
    }
}

#[cfg(test)]
#[path = "result_test.rs"]
mod tests;
