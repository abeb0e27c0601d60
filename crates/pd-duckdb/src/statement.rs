//! DuckDB statement backend

use crate::connection::{engine_error, lock, SharedConn};
use crate::values::{cell_to_value, row_to_cells};
use duckdb::params_from_iter;
use duckdb::types::Value;
use pd_driver::{BackendError, BackendResult, Cell, Row, StatementImpl, Table};

/// A query validated at prepare time.
///
/// DuckDB statements borrow their connection, so the compiled statement
/// lives in the connection's statement cache and is looked up again on
/// every execute. Parameters bind by position; names are accepted but not
/// used.
pub struct DuckDbStatement {
    conn: SharedConn,
    sql: String,
    params: Vec<Value>,
    last_error: String,
}

impl DuckDbStatement {
    pub(crate) fn new(conn: SharedConn, sql: &str) -> Self {
        Self {
            conn,
            sql: sql.to_string(),
            params: Vec::new(),
            last_error: String::new(),
        }
    }

    /// Run the query and collect `(column_names, rows)`
    fn run(&self) -> BackendResult<(Vec<String>, Vec<Row>)> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare_cached(&self.sql).map_err(engine_error)?;

        // Column metadata is only available once the statement has run, so
        // rows are collected first.
        let rows: Vec<Row> = stmt
            .query_map(params_from_iter(self.params.iter()), |row| row_to_cells(row))
            .map_err(engine_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(engine_error)?;

        let column_count = stmt.column_count();
        let columns: Vec<String> = (0..column_count)
            .map(|i| {
                stmt.column_name(i)
                    .map_or_else(|_| format!("col_{i}"), |name| name.to_string())
            })
            .collect();

        Ok((columns, rows))
    }
}

impl StatementImpl for DuckDbStatement {
    fn execute(&mut self, table: &mut Table) -> BackendResult<()> {
        match self.run() {
            Ok((columns, rows)) => {
                table.set_columns(columns);
                for row in rows {
                    table.push_row(row);
                }
                Ok(())
            }
            Err(e) => {
                if let BackendError::Failed { message, .. } = &e {
                    self.last_error = message.clone();
                }
                Err(e)
            }
        }
    }

    fn bind(&mut self, value: &Cell, _name: Option<&str>, position: usize) -> BackendResult<()> {
        if position >= self.params.len() {
            self.params.resize(position + 1, Value::Null);
        }
        self.params[position] = cell_to_value(value);
        Ok(())
    }

    fn reset(&mut self) -> BackendResult<()> {
        Ok(())
    }

    fn clear_bindings(&mut self) -> BackendResult<()> {
        self.params.clear();
        Ok(())
    }

    fn error_message(&self) -> String {
        self.last_error.clone()
    }
}
