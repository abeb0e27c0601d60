//! plugdb CLI - query any backend through the plugdb driver

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::Cli;
use commands::{plugin, query, schema};

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        cli::Commands::Query(args) => query::execute(args, &cli.global),
        cli::Commands::Plugin(args) => plugin::execute(args, &cli.global),
        cli::Commands::Schema(args) => schema::execute(args, &cli.global),
    }
}
