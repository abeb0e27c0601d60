//! DuckDB connection backend

use crate::statement::DuckDbStatement;
use crate::{BACKEND_NAME, ENGINE};
use pd_driver::{
    BackendError, BackendResult, ConnectionImpl, ConnectionParameters, ForeignBox,
    LibraryInitGuard, StatementImpl,
};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared by the connection and every statement prepared on it
pub(crate) type SharedConn = Arc<Mutex<duckdb::Connection>>;

pub(crate) fn lock(conn: &SharedConn) -> BackendResult<MutexGuard<'_, duckdb::Connection>> {
    conn.lock()
        .map_err(|e| BackendError::failed(format!("DuckDB mutex poisoned: {e}")))
}

pub(crate) fn engine_error(err: duckdb::Error) -> BackendError {
    BackendError::failed(err.to_string())
}

/// DuckDB database backend
pub struct DuckDbConnection {
    conn: Option<SharedConn>,
    in_manual_transaction: bool,
    last_error: String,
    _engine: LibraryInitGuard<'static>,
}

impl DuckDbConnection {
    pub fn new() -> Self {
        Self {
            conn: None,
            in_manual_transaction: false,
            last_error: String::new(),
            _engine: ENGINE.guard(),
        }
    }

    fn conn(&self) -> BackendResult<&SharedConn> {
        self.conn
            .as_ref()
            .ok_or_else(|| BackendError::failed("DuckDB connection is not open"))
    }

    /// Record the message of a failed call before handing it back
    fn track<T>(&mut self, result: BackendResult<T>) -> BackendResult<T> {
        if let Err(BackendError::Failed { message, .. }) = &result {
            self.last_error = message.clone();
        }
        result
    }

    fn execute_batch(&mut self, sql: &str) -> BackendResult<()> {
        let result = self
            .conn()
            .and_then(|conn| lock(conn)?.execute_batch(sql).map_err(engine_error));
        self.track(result)
    }
}

impl Default for DuckDbConnection {
    fn default() -> Self {
        Self::new()
    }
}

/// Open `filename`, treating empty and `:memory:` as an in-memory database
fn open(filename: &str) -> duckdb::Result<duckdb::Connection> {
    if filename.is_empty() || filename == ":memory:" {
        duckdb::Connection::open_in_memory()
    } else {
        duckdb::Connection::open(Path::new(filename))
    }
}

impl ConnectionImpl for DuckDbConnection {
    fn backend_name(&self) -> &str {
        BACKEND_NAME
    }

    fn connect(&mut self, params: &ConnectionParameters) -> BackendResult<()> {
        let conn = match open(&params.filename) {
            Ok(conn) => conn,
            Err(e) => {
                let err = BackendError::failed(format!("{e}: {}", params.filename));
                return self.track(Err(err));
            }
        };
        if let Ok(version) = conn.query_row("SELECT version()", [], |row| row.get::<_, String>(0))
        {
            log::debug!("Opened DuckDB {version} database '{}'", params.filename);
        }
        self.conn = Some(Arc::new(Mutex::new(conn)));
        self.in_manual_transaction = false;
        Ok(())
    }

    fn disconnect(&mut self) -> BackendResult<()> {
        if self.in_manual_transaction {
            if let Err(e) = self.execute_batch("ROLLBACK") {
                log::warn!("Rolling back open DuckDB transaction failed: {e}");
            }
            self.in_manual_transaction = false;
        }
        self.conn = None;
        Ok(())
    }

    fn prepare(&mut self, query: &str) -> BackendResult<ForeignBox<dyn StatementImpl>> {
        let result = self.conn().and_then(|conn| {
            // Compiling through the cache validates the query now and lets
            // execute reuse the compiled statement.
            lock(conn)?
                .prepare_cached(query)
                .map(drop)
                .map_err(engine_error)?;
            Ok(Arc::clone(conn))
        });
        let conn = self.track(result)?;
        let statement: Box<dyn StatementImpl> = Box::new(DuckDbStatement::new(conn, query));
        Ok(ForeignBox::new(statement))
    }

    /// Multi-statement scripts are allowed here.
    fn execute(&mut self, query: &str) -> BackendResult<()> {
        self.execute_batch(query)
    }

    fn error_message(&self) -> String {
        self.last_error.clone()
    }

    fn set_autocommit(&mut self, enabled: bool) -> BackendResult<()> {
        match (enabled, self.in_manual_transaction) {
            (false, false) => {
                self.execute_batch("BEGIN TRANSACTION")?;
                self.in_manual_transaction = true;
            }
            (true, true) => {
                self.execute_batch("COMMIT")?;
                self.in_manual_transaction = false;
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "connection_test.rs"]
mod tests;
