//! Export and import without the bridge.
//!
//! These are the offline halves of the sync flows: `export` writes the
//! interchange file from the store, `import` merges a file into it.
//! Useful for inspection, recovery, and moving data between machines by
//! hand.

use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::cli::Cli;
use crate::error::Result;
use crate::interchange::{file, Exporter, MergeImporter, MergeStyle};

/// Execute the export command.
///
/// # Errors
///
/// Returns an error when the project is not initialized or the export
/// fails.
pub fn export(cli: &Cli, json: bool) -> Result<()> {
    let layout = super::resolve_layout(cli.project.as_ref())?;
    let store = super::open_store(&layout)?;

    let path = Exporter::new(&store, &layout).export()?;
    let records = file::count_records(&path)?;

    if json {
        let output = serde_json::json!({
            "file": path,
            "records": records,
            "bytes": file::file_size(&path),
        });
        println!("{output}");
    } else {
        println!(
            "{} {records} entries to {}",
            "Exported".green().bold(),
            path.display()
        );
    }
    Ok(())
}

/// Execute the import command.
///
/// Mirrors the file by default; `--keep-both` unions instead.
///
/// # Errors
///
/// Returns an error when the project is not initialized or the import
/// fails. A failed import commits nothing.
pub fn import(cli: &Cli, source: &Path, keep_both: bool, json: bool) -> Result<()> {
    let layout = super::resolve_layout(cli.project.as_ref())?;
    let mut store = super::open_store(&layout)?;

    let style = if keep_both {
        MergeStyle::KeepBoth
    } else {
        MergeStyle::KeepOnlyNew
    };
    let log: PathBuf = MergeImporter::new(&mut store, &layout, style).import(source)?;

    if json {
        let output = serde_json::json!({
            "file": source,
            "style": style.to_string(),
            "entries": store.entry_count()?,
            "change_log": log,
        });
        println!("{output}");
    } else {
        println!(
            "{} {} ({style})",
            "Imported".green().bold(),
            source.display()
        );
        println!("  Change log: {}", log.display());
    }
    Ok(())
}
