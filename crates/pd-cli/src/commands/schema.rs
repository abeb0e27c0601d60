//! Schema command implementation

use anyhow::{Context, Result};
use pd_driver::Migrator;

use crate::cli::{GlobalArgs, SchemaArgs, SchemaCommands};
use crate::commands::common::open_connection;

/// Execute the schema command
pub(crate) fn execute(args: &SchemaArgs, global: &GlobalArgs) -> Result<()> {
    let conn = open_connection(global)?;
    let migrator = Migrator::new();

    if args.command == SchemaCommands::Init {
        migrator
            .init_schema(&conn)
            .context("Failed to initialize schema version table")?;
        if global.verbose {
            eprintln!("[verbose] Schema version table ready");
        }
    }

    let version = migrator
        .schema_version(&conn)
        .context("Failed to read schema version")?;
    println!("{version}");
    Ok(())
}
