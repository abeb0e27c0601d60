//! pd-duckdb - DuckDB backend module for plugdb
//!
//! Builds both as a loadable module (cdylib exporting the plugin entry points)
//! and as an rlib that a binary can link statically with [`register`].

pub mod connection;
pub mod statement;
pub mod values;

pub use connection::DuckDbConnection;
pub use statement::DuckDbStatement;

use pd_driver::{ConnectionImpl, DbResult, LibraryInit, PluginLoader};

/// Backend identifier used in connection parameters
pub const BACKEND_NAME: &str = "duckdb";

fn engine_init() {
    log::debug!("DuckDB backend {} initialized", env!("CARGO_PKG_VERSION"));
}

fn engine_teardown() {
    log::debug!("DuckDB backend released");
}

/// Held by every live [`DuckDbConnection`]
pub(crate) static ENGINE: LibraryInit = LibraryInit::new(engine_init, engine_teardown);

pd_plugin::declare_plugin! {
    version: "0.1.0",
    classes: {
        "DatabaseConnection" => dyn ConnectionImpl = DuckDbConnection::new(),
    }
}

/// Register this backend with `loader` under [`BACKEND_NAME`]
pub fn register(loader: &PluginLoader) -> DbResult<()> {
    loader.register_static(
        BACKEND_NAME,
        Some(pd_plugin_version),
        pd_register_classes,
    )
}
