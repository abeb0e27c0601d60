//! Prepared statements and parameter binding

use crate::backend::{BackendError, BackendResult, FetchMode, StatementImpl};
use crate::connection::Connection;
use crate::error::{DbError, DbResult};
use crate::result::QueryResult;
use pd_core::{Cell, Row, Table};
use pd_plugin::ForeignBox;
use std::fmt;
use std::io::Read;

/// A prepared statement.
///
/// Holds its own connection handle, so the backend module stays loaded even
/// after the caller drops the [`Connection`] it was prepared on. Bound cells
/// are retained until [`reset`](Statement::reset) or
/// [`clear_bindings`](Statement::clear_bindings).
pub struct Statement {
    // Declared before `connection`: the backend statement is destroyed while
    // its connection is still open.
    stmt: ForeignBox<dyn StatementImpl>,
    connection: Connection,
    query: String,
    bindings: Vec<Cell>,
}

impl Statement {
    pub(crate) fn new(
        stmt: ForeignBox<dyn StatementImpl>,
        connection: Connection,
        query: String,
    ) -> Self {
        Self {
            stmt,
            connection,
            query,
            bindings: Vec::new(),
        }
    }

    fn backend_error(&self, operation: &str, err: BackendError) -> DbError {
        DbError::from_backend(self.connection.backend_name(), operation, err)
    }

    /// Run one backend statement call under the connection lock
    fn call<T>(
        &mut self,
        operation: &str,
        f: impl FnOnce(&mut dyn StatementImpl) -> BackendResult<T>,
    ) -> DbResult<T> {
        let stmt = &mut self.stmt;
        let result = self.connection.serialized(|| f(&mut **stmt))?;
        result.map_err(|e| self.backend_error(operation, e))
    }

    /// Bind `value` at the next free position
    pub fn bind(&mut self, value: impl Into<Cell>) -> DbResult<&mut Self> {
        let position = self.bindings.len();
        self.bind_cell(value.into(), None, position)
    }

    /// Bind `value` at zero-based `position`, replacing any earlier binding there
    pub fn bind_at(&mut self, position: usize, value: impl Into<Cell>) -> DbResult<&mut Self> {
        self.bind_cell(value.into(), None, position)
    }

    /// Bind `value` to a named parameter at the next free position
    pub fn bind_named(&mut self, name: &str, value: impl Into<Cell>) -> DbResult<&mut Self> {
        let position = self.bindings.len();
        self.bind_cell(value.into(), Some(name), position)
    }

    /// Drain `reader` and bind its bytes as a blob input at the next position
    pub fn bind_reader<R: Read>(&mut self, reader: R) -> DbResult<&mut Self> {
        let cell = Cell::blob_input(reader)?;
        let position = self.bindings.len();
        self.bind_cell(cell, None, position)
    }

    fn bind_cell(
        &mut self,
        cell: Cell,
        name: Option<&str>,
        position: usize,
    ) -> DbResult<&mut Self> {
        self.call("bind", |stmt| stmt.bind(&cell, name, position))?;
        if position < self.bindings.len() {
            self.bindings[position] = cell;
        } else {
            self.bindings.resize(position, Cell::Null);
            self.bindings.push(cell);
        }
        Ok(self)
    }

    /// Run the statement against the current bindings
    fn run(&mut self) -> DbResult<Table> {
        let mut table = Table::new();
        self.call("execute", |stmt| stmt.execute(&mut table))
            .inspect_err(|e| log::debug!("Execution failed: {e}"))?;
        Ok(table)
    }

    /// Execute and borrow the statement for the lifetime of the result
    pub fn execute(&mut self) -> DbResult<QueryResult<'_>> {
        let table = self.run()?;
        Ok(QueryResult::borrowed(self, table))
    }

    /// Execute and move the statement into the result
    pub fn into_result(mut self) -> DbResult<QueryResult<'static>> {
        let table = self.run()?;
        Ok(QueryResult::owned(Box::new(self), table))
    }

    /// Return to the freshly prepared state and drop every binding
    pub fn reset(&mut self) -> DbResult<()> {
        self.call("reset", |stmt| stmt.reset())?;
        self.clear_bindings()
    }

    pub fn clear_bindings(&mut self) -> DbResult<()> {
        self.call("clear bindings", |stmt| stmt.clear_bindings())?;
        self.bindings.clear();
        Ok(())
    }

    /// Rewind the backend cursor, keeping the bindings
    pub(crate) fn rewind(&mut self) {
        if let Err(e) = self.call("rewind", |stmt| stmt.reset()) {
            log::warn!("Failed to rewind statement: {e}");
        }
    }

    /// Next row from a streaming backend statement
    pub(crate) fn fetch_row(&mut self) -> DbResult<Option<Row>> {
        self.call("fetch", |stmt| stmt.fetch())
    }

    pub(crate) fn fetch_mode(&self) -> FetchMode {
        self.stmt.fetch_mode()
    }

    pub fn last_insert_id(&mut self) -> DbResult<i64> {
        self.call("last insert id", |stmt| stmt.last_insert_id())
    }

    pub fn error_message(&self) -> String {
        self.stmt.error_message()
    }

    /// Cells currently bound, by position
    pub fn bound(&self) -> &[Cell] {
        &self.bindings
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }
}

impl fmt::Debug for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("backend", &self.connection.backend_name())
            .field("query", &self.query)
            .field("bindings", &self.bindings)
            .finish()
    }
}

#[cfg(test)]
#[path = "statement_test.rs"]
mod tests;
