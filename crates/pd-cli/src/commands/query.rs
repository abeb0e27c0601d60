//! Query command implementation

use anyhow::{Context, Result};
use pd_core::Table;
use pd_driver::Connection;
use std::path::Path;

use crate::cli::{GlobalArgs, QueryArgs};
use crate::commands::common::open_connection;

/// Execute the query command
pub(crate) fn execute(args: &QueryArgs, global: &GlobalArgs) -> Result<()> {
    let conn = open_connection(global)?;
    let table = run(&conn, args)?;

    if global.verbose {
        eprintln!(
            "[verbose] {} column(s), {} row(s)",
            table.columns().len(),
            table.len()
        );
    }
    print!("{}", render(&table, args.json)?);
    Ok(())
}

/// Prepare, bind and fully fetch the query
pub(crate) fn run(conn: &Connection, args: &QueryArgs) -> Result<Table> {
    let mut stmt = match (&args.sql, &args.file) {
        (_, Some(file)) => conn
            .prepare_from_file(Path::new(file))
            .with_context(|| format!("Failed to prepare query from {file}"))?,
        (Some(sql), None) => conn.prepare(sql).context("Failed to prepare query")?,
        (None, None) => anyhow::bail!("No query given"),
    };

    for value in &args.params {
        stmt.bind(value.as_str())?;
    }

    let table = stmt
        .execute()
        .and_then(|mut result| result.fetch_all())
        .context("Query failed")?;
    Ok(table)
}

pub(crate) fn render(table: &Table, json: bool) -> Result<String> {
    if json {
        let mut out = serde_json::to_string_pretty(&table.to_json())?;
        out.push('\n');
        return Ok(out);
    }
    if table.columns().is_empty() {
        return Ok("OK\n".to_string());
    }
    let suffix = if table.len() == 1 { "" } else { "s" };
    Ok(format!("{table}({} row{suffix})\n", table.len()))
}

#[cfg(test)]
#[path = "query_test.rs"]
mod tests;
