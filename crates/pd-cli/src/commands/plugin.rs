//! Plugin command implementation

use anyhow::{Context, Result};
use std::path::Path;

use crate::cli::{GlobalArgs, PluginArgs};
use crate::commands::common::loader;

/// Execute the plugin command
pub(crate) fn execute(args: &PluginArgs, global: &GlobalArgs) -> Result<()> {
    let path = Path::new(&args.path);
    let library = loader()?
        .open_library(path)
        .with_context(|| format!("Failed to load module {}", path.display()))?;

    if global.verbose {
        eprintln!("[verbose] Loaded {}", path.display());
    }

    println!("Module:  {}", library.name());
    println!("Version: {}", library.version());
    println!("Classes:");
    for class in library.class_names() {
        println!("  {class}");
    }
    Ok(())
}
