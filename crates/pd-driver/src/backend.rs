//! Contracts a backend module implements.
//!
//! A module registers one class, [`CONNECTION_CLASS`], whose object type is
//! `Box<dyn ConnectionImpl>`. Everything else the module hands out (statements,
//! migrators) travels as a [`ForeignBox`] built inside the module, so it is
//! always destroyed by module code.

use crate::connection::Connection;
use crate::error::DbResult;
use crate::migrator::Migration;
use pd_core::{Cell, ConnectionParameters, Row, Table, TypeId};
use pd_plugin::ForeignBox;
use thiserror::Error;

/// Class name every backend module registers its connection under
pub const CONNECTION_CLASS: &str = "DatabaseConnection";

/// Failure reported by a backend call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Engine-native failure with its code and message
    #[error("{message} (code {code})")]
    Failed { code: i32, message: String },

    #[error("unsupported cell type {0}")]
    UnsupportedType(TypeId),

    #[error("{0} is not implemented")]
    NotImplemented(&'static str),
}

impl BackendError {
    /// Failure without an engine error code
    pub fn failed(message: impl Into<String>) -> Self {
        BackendError::Failed {
            code: -1,
            message: message.into(),
        }
    }
}

/// Result type alias for BackendError
pub type BackendResult<T> = Result<T, BackendError>;

/// How a statement delivers rows after `execute`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// All rows are materialized into the table passed to `execute`
    #[default]
    Batch,
    /// `execute` fills in column names only; rows come from `fetch`
    Streaming,
}

/// A prepared statement owned by a backend module
pub trait StatementImpl: Send {
    /// Run the statement. Column names must be set on `table` before any row.
    fn execute(&mut self, table: &mut Table) -> BackendResult<()>;

    /// Bind `value` at zero-based `position`, or by `name` when given
    fn bind(&mut self, value: &Cell, name: Option<&str>, position: usize) -> BackendResult<()>;

    /// Return to the freshly prepared state, dropping any pending rows
    fn reset(&mut self) -> BackendResult<()>;

    fn clear_bindings(&mut self) -> BackendResult<()>;

    fn fetch_mode(&self) -> FetchMode {
        FetchMode::Batch
    }

    /// Next row of a streaming result; `None` once exhausted
    fn fetch(&mut self) -> BackendResult<Option<Row>> {
        Ok(None)
    }

    fn last_insert_id(&mut self) -> BackendResult<i64> {
        Err(BackendError::NotImplemented("last_insert_id"))
    }

    /// Most recent engine diagnostic, empty when none
    fn error_message(&self) -> String {
        String::new()
    }
}

/// A database connection owned by a backend module
pub trait ConnectionImpl: Send {
    /// Short identifier used in logs and errors, e.g. `duckdb`
    fn backend_name(&self) -> &str;

    fn connect(&mut self, params: &ConnectionParameters) -> BackendResult<()>;

    fn disconnect(&mut self) -> BackendResult<()>;

    /// Compile `query`; syntax errors must be reported here
    fn prepare(&mut self, query: &str) -> BackendResult<ForeignBox<dyn StatementImpl>>;

    /// One-shot execution, discarding any rows
    fn execute(&mut self, query: &str) -> BackendResult<()> {
        let mut statement = self.prepare(query)?;
        let mut table = Table::new();
        statement.execute(&mut table)
    }

    /// Backend-specific migrator; `None` selects the portable default
    fn migrator(&mut self) -> Option<ForeignBox<dyn MigratorImpl>> {
        None
    }

    fn error_message(&self) -> String {
        String::new()
    }

    fn start_transaction(&mut self) -> BackendResult<()> {
        self.execute("BEGIN TRANSACTION")
    }

    fn commit(&mut self) -> BackendResult<()> {
        self.execute("COMMIT")
    }

    fn rollback(&mut self) -> BackendResult<()> {
        self.execute("ROLLBACK")
    }

    fn set_autocommit(&mut self, _enabled: bool) -> BackendResult<()> {
        Err(BackendError::NotImplemented("autocommit"))
    }
}

/// Schema-version bookkeeping for [`Migrator`](crate::Migrator)
pub trait MigratorImpl: Send {
    /// Create the version store if missing and seed version 0. Idempotent.
    fn init_schema(&mut self, conn: &Connection) -> DbResult<()>;

    fn schema_version(&mut self, conn: &Connection) -> DbResult<i64>;

    fn set_schema_version(&mut self, conn: &Connection, version: i64) -> DbResult<()>;

    /// Apply one migration and record its target version atomically
    fn run_migration(&mut self, conn: &Connection, migration: &Migration) -> DbResult<()> {
        conn.transaction(|conn| {
            migration.apply(conn)?;
            self.set_schema_version(conn, migration.to_version())
        })
    }
}
