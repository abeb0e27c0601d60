//! In-process mock backend used by the unit tests.
//!
//! Queries are tiny commands rather than SQL:
//!
//! - `rows N`   batch result with N rows `(n, label)`
//! - `stream N` streaming result with N rows `(n, label)`
//! - `echo`     one row holding the bound cells
//! - `fail`     execution fails with code 42
//! - `bad ...`  rejected at prepare
//! - `panic`    panics inside prepare
//! - anything else runs with no rows and is recorded in the event log
//!
//! Every connection keeps its state in a [`MockDb`] keyed by `dbname`, so
//! tests can inspect what the backend saw after the connection is gone.

use crate::backend::{
    BackendError, BackendResult, ConnectionImpl, FetchMode, MigratorImpl, StatementImpl,
};
use crate::connection::Connection;
use crate::error::{DbError, DbResult};
use crate::loader::PluginLoader;
use pd_core::{Cell, ConnectionParameters, Row, Table, TypeId};
use pd_plugin::ForeignBox;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

pub(crate) const BACKEND: &str = "mock";

#[derive(Debug, Default)]
pub(crate) struct MockDb {
    pub events: Vec<String>,
    pub version: Option<i64>,
    snapshot: Option<Option<i64>>,
}

type SharedDb = Arc<Mutex<MockDb>>;

fn databases() -> &'static Mutex<HashMap<String, SharedDb>> {
    static DATABASES: OnceLock<Mutex<HashMap<String, SharedDb>>> = OnceLock::new();
    DATABASES.get_or_init(|| Mutex::new(HashMap::new()))
}

/// State of the mock database named `dbname`
pub(crate) fn database(dbname: &str) -> SharedDb {
    Arc::clone(
        databases()
            .lock()
            .unwrap()
            .entry(dbname.to_string())
            .or_default(),
    )
}

pub(crate) fn events(dbname: &str) -> Vec<String> {
    database(dbname).lock().unwrap().events.clone()
}

fn record(db: &SharedDb, event: impl Into<String>) {
    db.lock().unwrap().events.push(event.into());
}

#[derive(Default)]
pub(crate) struct MockConnection {
    db: Option<SharedDb>,
    last_error: String,
}

impl MockConnection {
    fn db(&self) -> BackendResult<&SharedDb> {
        self.db
            .as_ref()
            .ok_or_else(|| BackendError::failed("not connected"))
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        if let Some(db) = &self.db {
            record(db, "destroyed");
        }
    }
}

impl ConnectionImpl for MockConnection {
    fn backend_name(&self) -> &str {
        BACKEND
    }

    fn connect(&mut self, params: &ConnectionParameters) -> BackendResult<()> {
        if params.dbname == "unreachable" {
            return Err(BackendError::Failed {
                code: 7,
                message: "host unreachable".to_string(),
            });
        }
        let db = database(&params.dbname);
        record(&db, "connect");
        self.db = Some(db);
        Ok(())
    }

    fn disconnect(&mut self) -> BackendResult<()> {
        record(self.db()?, "disconnect");
        Ok(())
    }

    fn prepare(&mut self, query: &str) -> BackendResult<ForeignBox<dyn StatementImpl>> {
        if query == "panic" {
            panic!("mock backend panicked in prepare");
        }
        if query.starts_with("bad") {
            self.last_error = format!("syntax error at '{query}'");
            return Err(BackendError::failed(self.last_error.clone()));
        }
        let statement = MockStatement::new(Arc::clone(self.db()?), query);
        Ok(ForeignBox::new(Box::new(statement)))
    }

    fn migrator(&mut self) -> Option<ForeignBox<dyn MigratorImpl>> {
        let db = Arc::clone(self.db.as_ref()?);
        Some(ForeignBox::new(Box::new(MockMigrator { db })))
    }

    fn error_message(&self) -> String {
        self.last_error.clone()
    }

    fn start_transaction(&mut self) -> BackendResult<()> {
        let mut db = self.db()?.lock().unwrap();
        db.snapshot = Some(db.version);
        db.events.push("begin".to_string());
        Ok(())
    }

    fn commit(&mut self) -> BackendResult<()> {
        let mut db = self.db()?.lock().unwrap();
        db.snapshot = None;
        db.events.push("commit".to_string());
        Ok(())
    }

    fn rollback(&mut self) -> BackendResult<()> {
        let mut db = self.db()?.lock().unwrap();
        if let Some(version) = db.snapshot.take() {
            db.version = version;
        }
        db.events.push("rollback".to_string());
        Ok(())
    }
}

struct MockStatement {
    db: SharedDb,
    query: String,
    bound: Vec<Cell>,
    mode: FetchMode,
    remaining: Vec<Row>,
}

impl MockStatement {
    fn new(db: SharedDb, query: &str) -> Self {
        let mode = if query.starts_with("stream") {
            FetchMode::Streaming
        } else {
            FetchMode::Batch
        };
        Self {
            db,
            query: query.to_string(),
            bound: Vec::new(),
            mode,
            remaining: Vec::new(),
        }
    }

    fn count(&self) -> usize {
        self.query
            .split_whitespace()
            .nth(1)
            .and_then(|n| n.parse().ok())
            .unwrap_or(0)
    }
}

fn numbered_rows(count: usize) -> Vec<Row> {
    (0..count)
        .map(|i| {
            let mut row = Row::new();
            row.push(i as i64);
            row.push(format!("row{i}"));
            row
        })
        .collect()
}

impl StatementImpl for MockStatement {
    fn execute(&mut self, table: &mut Table) -> BackendResult<()> {
        record(&self.db, format!("execute {}", self.query));
        if self.query == "fail" {
            return Err(BackendError::Failed {
                code: 42,
                message: "boom".to_string(),
            });
        }
        if self.query == "echo" {
            table.set_columns((0..self.bound.len()).map(|i| format!("p{i}")).collect());
            table.push_row(self.bound.iter().cloned().collect());
            return Ok(());
        }
        if self.query.starts_with("rows") || self.query.starts_with("stream") {
            table.set_columns(vec!["n".to_string(), "label".to_string()]);
            let rows = numbered_rows(self.count());
            match self.mode {
                FetchMode::Batch => rows.into_iter().for_each(|row| table.push_row(row)),
                FetchMode::Streaming => {
                    self.remaining = rows;
                    self.remaining.reverse();
                }
            }
        }
        Ok(())
    }

    fn bind(&mut self, value: &Cell, name: Option<&str>, position: usize) -> BackendResult<()> {
        if value.type_id() == TypeId::Float {
            return Err(BackendError::UnsupportedType(TypeId::Float));
        }
        if let Some(name) = name {
            record(&self.db, format!("bind {name}"));
        }
        if position >= self.bound.len() {
            self.bound.resize(position + 1, Cell::Null);
        }
        self.bound[position] = value.clone();
        Ok(())
    }

    fn reset(&mut self) -> BackendResult<()> {
        self.remaining.clear();
        record(&self.db, format!("reset {}", self.query));
        Ok(())
    }

    fn clear_bindings(&mut self) -> BackendResult<()> {
        self.bound.clear();
        Ok(())
    }

    fn fetch_mode(&self) -> FetchMode {
        self.mode
    }

    fn fetch(&mut self) -> BackendResult<Option<Row>> {
        Ok(self.remaining.pop())
    }

    fn last_insert_id(&mut self) -> BackendResult<i64> {
        Ok(self.bound.len() as i64)
    }
}

struct MockMigrator {
    db: SharedDb,
}

impl MigratorImpl for MockMigrator {
    fn init_schema(&mut self, _conn: &Connection) -> DbResult<()> {
        let mut db = self.db.lock().unwrap();
        if db.version.is_none() {
            db.version = Some(0);
        }
        Ok(())
    }

    fn schema_version(&mut self, _conn: &Connection) -> DbResult<i64> {
        self.db
            .lock()
            .unwrap()
            .version
            .ok_or_else(|| DbError::Migration("schema version not available".to_string()))
    }

    fn set_schema_version(&mut self, _conn: &Connection, version: i64) -> DbResult<()> {
        self.db.lock().unwrap().version = Some(version);
        Ok(())
    }
}

mod entry {
    use super::MockConnection;
    use crate::backend::ConnectionImpl;

    pd_plugin::declare_plugin! {
        version: "0.0.1-mock",
        classes: {
            "DatabaseConnection" => dyn ConnectionImpl = MockConnection::default(),
        }
    }
}

/// A loader with the mock backend registered
pub(crate) fn loader() -> Arc<PluginLoader> {
    let loader = PluginLoader::new();
    loader
        .register_static(
            BACKEND,
            Some(entry::pd_plugin_version),
            entry::pd_register_classes,
        )
        .unwrap();
    Arc::new(loader)
}

/// Parameters for a fresh mock database named `dbname`
pub(crate) fn params(dbname: &str) -> ConnectionParameters {
    ConnectionParameters::new(BACKEND).with_dbname(dbname)
}

pub(crate) fn open(dbname: &str) -> Connection {
    loader().load(&params(dbname)).unwrap()
}
