//! Versioned schema migrations.
//!
//! The schema version is a single counter stored by the backend (the default
//! store is the `schema_info` table). [`Migrator::start_migration`] repeatedly
//! looks up the migration whose `from_version` equals the stored version and
//! applies it in its own transaction, until no migration matches.

use crate::backend::MigratorImpl;
use crate::connection::Connection;
use crate::error::{DbError, DbResult};
use pd_core::Cell;
use pd_plugin::ForeignBox;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::AssertUnwindSafe;

type UpgradeFn = dyn Fn(&Connection) -> DbResult<()> + Send + Sync;

/// One schema upgrade step
pub struct Migration {
    from_version: i64,
    to_version: i64,
    upgrade: Box<UpgradeFn>,
}

impl Migration {
    pub fn new<F>(from_version: i64, to_version: i64, upgrade: F) -> Self
    where
        F: Fn(&Connection) -> DbResult<()> + Send + Sync + 'static,
    {
        Self {
            from_version,
            to_version,
            upgrade: Box::new(upgrade),
        }
    }

    pub fn from_version(&self) -> i64 {
        self.from_version
    }

    pub fn to_version(&self) -> i64 {
        self.to_version
    }

    /// Run the upgrade function. A panic is reported as [`DbError::Migration`].
    pub fn apply(&self, conn: &Connection) -> DbResult<()> {
        match std::panic::catch_unwind(AssertUnwindSafe(|| (self.upgrade)(conn))) {
            Ok(result) => result,
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(DbError::Migration(format!(
                    "upgrade {} -> {} panicked: {reason}",
                    self.from_version, self.to_version
                )))
            }
        }
    }
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration")
            .field("from_version", &self.from_version)
            .field("to_version", &self.to_version)
            .finish_non_exhaustive()
    }
}

/// Registered migrations, keyed by `from_version`
#[derive(Debug, Default)]
pub struct Migrator {
    migrations: BTreeMap<i64, Migration>,
}

impl Migrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a migration. Each `from_version` may be registered once, and
    /// every migration must move the version forward.
    pub fn add_migration(&mut self, migration: Migration) -> DbResult<()> {
        if migration.to_version <= migration.from_version {
            return Err(DbError::Migration(format!(
                "migration {} -> {} does not increase the schema version",
                migration.from_version, migration.to_version
            )));
        }
        if self.migrations.contains_key(&migration.from_version) {
            return Err(DbError::Migration(format!(
                "a migration from version {} is already registered",
                migration.from_version
            )));
        }
        self.migrations.insert(migration.from_version, migration);
        Ok(())
    }

    /// Registered migrations in `from_version` order
    pub fn migrations(&self) -> impl Iterator<Item = &Migration> {
        self.migrations.values()
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Create the version store and seed version 0 if it is missing.
    pub fn init_schema(&self, conn: &Connection) -> DbResult<()> {
        resolve(conn)?.init_schema(conn)
    }

    pub fn schema_version(&self, conn: &Connection) -> DbResult<i64> {
        resolve(conn)?.schema_version(conn)
    }

    /// Apply every reachable migration in order. Returns how many ran.
    ///
    /// A failing step is rolled back and aborts the run; steps committed
    /// before it stay applied.
    pub fn start_migration(&mut self, conn: &Connection) -> DbResult<usize> {
        let mut store = resolve(conn)?;
        let mut applied = 0;

        loop {
            let current = store.schema_version(conn)?;
            let Some(migration) = self.migrations.get(&current) else {
                break;
            };

            log::info!(
                "Migrating {} schema {} -> {}",
                conn.backend_name(),
                migration.from_version,
                migration.to_version
            );
            store.run_migration(conn, migration).map_err(|e| match e {
                DbError::Migration(message) => DbError::Migration(message),
                other => DbError::Migration(format!(
                    "upgrade {} -> {} failed: {other}",
                    migration.from_version, migration.to_version
                )),
            })?;
            applied += 1;
        }

        log::debug!("Applied {applied} migration(s) to {}", conn.backend_name());
        Ok(applied)
    }
}

/// The backend's own migrator, or the portable default
fn resolve(conn: &Connection) -> DbResult<ForeignBox<dyn MigratorImpl>> {
    Ok(conn
        .backend_migrator()?
        .unwrap_or_else(|| ForeignBox::new(Box::new(SchemaInfoMigrator))))
}

/// Portable version store over `schema_info(name, value)`
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaInfoMigrator;

const VERSION_KEY: &str = "version";

impl MigratorImpl for SchemaInfoMigrator {
    fn init_schema(&mut self, conn: &Connection) -> DbResult<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_info (name TEXT PRIMARY KEY, value TEXT)",
        )?;
        if read_version(conn)?.is_none() {
            let mut insert = conn.prepare("INSERT INTO schema_info (name, value) VALUES (?, ?)")?;
            insert.bind(VERSION_KEY)?.bind("0")?;
            drop(insert.execute()?);
            log::debug!("Initialized schema_info on {}", conn.backend_name());
        }
        Ok(())
    }

    fn schema_version(&mut self, conn: &Connection) -> DbResult<i64> {
        read_version(conn)?
            .ok_or_else(|| DbError::Migration("schema version not available".to_string()))
    }

    fn set_schema_version(&mut self, conn: &Connection, version: i64) -> DbResult<()> {
        let mut update = conn.prepare("UPDATE schema_info SET value = ? WHERE name = ?")?;
        update.bind(version.to_string())?.bind(VERSION_KEY)?;
        drop(update.execute()?);
        Ok(())
    }
}

fn read_version(conn: &Connection) -> DbResult<Option<i64>> {
    let mut select = conn.prepare("SELECT value FROM schema_info WHERE name = ?")?;
    select.bind(VERSION_KEY)?;
    let mut result = select.execute()?;
    let Some(row) = result.fetch()? else {
        return Ok(None);
    };
    match row.get(0) {
        Some(Cell::String(value)) => value.trim().parse::<i64>().map(Some).map_err(|e| {
            DbError::Migration(format!("invalid stored schema version '{value}': {e}"))
        }),
        Some(Cell::Int64(value)) => Ok(Some(*value)),
        Some(other) => Err(DbError::Migration(format!(
            "invalid stored schema version of type {}",
            other.type_id()
        ))),
        None => Err(DbError::Migration("schema version not available".to_string())),
    }
}

#[cfg(test)]
#[path = "migrator_test.rs"]
mod tests;
