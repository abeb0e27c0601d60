//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use pd_core::ConnectionParameters;
use pd_driver::{Connection, PluginLoader};
use std::path::Path;
use std::sync::Arc;

use crate::cli::GlobalArgs;

/// Connection parameters from `--config`, with command-line overrides applied.
///
/// Without a config file the statically linked DuckDB backend is used with an
/// in-memory database.
pub(crate) fn connection_parameters(global: &GlobalArgs) -> Result<ConnectionParameters> {
    let mut params = match &global.config {
        Some(path) => ConnectionParameters::load(Path::new(path))
            .with_context(|| format!("Failed to load connection parameters from {path}"))?,
        None => ConnectionParameters::new(pd_duckdb::BACKEND_NAME),
    };

    if let Some(backend) = &global.backend {
        params.backend = backend.clone();
    }
    if let Some(database) = &global.database {
        params.filename = database.clone();
    }
    if let Some(dir) = &global.plugin_dir {
        params.plugin_dir = dir.into();
    }
    params.resolve_password_from_env();
    Ok(params)
}

/// The process-wide loader with the linked-in backends registered
pub(crate) fn loader() -> Result<Arc<PluginLoader>> {
    let loader = PluginLoader::global();
    if !loader
        .static_backends()
        .iter()
        .any(|name| name == pd_duckdb::BACKEND_NAME)
    {
        pd_duckdb::register(&loader).context("Failed to register the DuckDB backend")?;
        log::debug!("Registered linked-in backends: {:?}", loader.static_backends());
    }
    Ok(loader)
}

/// Open a connection described by the global arguments
pub(crate) fn open_connection(global: &GlobalArgs) -> Result<Connection> {
    let params = connection_parameters(global)?;
    if global.verbose {
        eprintln!("[verbose] Connecting with {:?}", params);
    }
    let conn = loader()?
        .load(&params)
        .with_context(|| format!("Failed to connect to backend '{}'", params.backend))?;
    if global.verbose {
        eprintln!(
            "[verbose] Connected to {} (module version {})",
            conn.backend_name(),
            conn.module_version()?
        );
    }
    Ok(conn)
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
