//! pd-driver - Driver manager for plugdb
//!
//! Client code talks to [`Connection`], [`Statement`] and [`QueryResult`];
//! backend modules implement [`ConnectionImpl`] and [`StatementImpl`] and are
//! resolved by the [`PluginLoader`]. [`Migrator`] applies versioned schema
//! upgrades on top of any backend.

pub mod backend;
pub mod connection;
pub mod error;
pub mod init;
pub mod loader;
pub mod migrator;
pub mod result;
pub mod shared;
pub mod statement;

#[cfg(test)]
mod test_backend;

pub use backend::{
    BackendError, BackendResult, ConnectionImpl, FetchMode, MigratorImpl, StatementImpl,
    CONNECTION_CLASS,
};
pub use connection::Connection;
pub use error::{DbError, DbResult};
pub use init::{LibraryInit, LibraryInitGuard};
pub use loader::PluginLoader;
pub use migrator::{Migration, Migrator, SchemaInfoMigrator};
pub use result::QueryResult;
pub use shared::{SharedConnection, ThreadLocalConnections};
pub use statement::Statement;

pub use pd_core::{Cell, ConnectionParameters, Row, Table, TypeId};
pub use pd_plugin::{declare_plugin, ForeignBox};
