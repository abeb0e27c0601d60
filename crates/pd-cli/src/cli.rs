//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand};

/// plugdb - one API for many database backends
#[derive(Parser, Debug)]
#[command(name = "pd")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Connection parameters file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Override the backend name
    #[arg(short, long, global = true)]
    pub backend: Option<String>,

    /// Override the database file
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Override the directory searched for backend modules
    #[arg(long, global = true)]
    pub plugin_dir: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a query and print its rows
    Query(QueryArgs),

    /// Load a backend module and describe it
    Plugin(PluginArgs),

    /// Manage the schema version table
    Schema(SchemaArgs),
}

/// Arguments for the query command
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// SQL text to run
    #[arg(required_unless_present = "file")]
    pub sql: Option<String>,

    /// Read the SQL from a file instead
    #[arg(short, long, conflicts_with = "sql")]
    pub file: Option<String>,

    /// Positional parameter values, bound in order as strings
    #[arg(short, long = "param")]
    pub params: Vec<String>,

    /// Print rows as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the plugin command
#[derive(Args, Debug)]
pub struct PluginArgs {
    /// Path to the module file
    pub path: String,
}

/// Arguments for the schema command
#[derive(Args, Debug)]
pub struct SchemaArgs {
    #[command(subcommand)]
    pub command: SchemaCommands,
}

/// Schema subcommands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaCommands {
    /// Create the version table if it does not exist
    Init,

    /// Print the current schema version
    Version,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
