//! Status command implementation.

use std::path::PathBuf;

use colored::Colorize;
use serde::Serialize;

use crate::cli::Cli;
use crate::conflict;
use crate::error::Result;
use crate::interchange::{self, file};
use crate::ledger::{self, ImportStatus};

/// Output for the status command.
#[derive(Serialize)]
struct StatusOutput {
    project: PathBuf,
    name: String,
    entries: usize,
    pending_import: &'static str,
    interchange: Option<InterchangeInfo>,
    annotation_logs: usize,
}

#[derive(Serialize)]
struct InterchangeInfo {
    path: PathBuf,
    records: usize,
    bytes: u64,
}

fn status_label(status: ImportStatus) -> &'static str {
    match status {
        ImportStatus::NoImportNeeded => "none",
        ImportStatus::BasicImportNeeded => "keep-both retry pending",
        ImportStatus::StandardImportNeeded => "keep-only-new retry pending",
    }
}

/// Execute the status command.
///
/// # Errors
///
/// Returns an error when the project is not initialized or its state
/// cannot be read.
pub fn execute(cli: &Cli, json: bool) -> Result<()> {
    let layout = super::resolve_layout(cli.project.as_ref())?;
    let store = super::open_store(&layout)?;

    let dir = layout.lexicon_repo_dir();
    let pending = ledger::get_status(&dir)?;
    let interchange = match interchange::discover_interchange_file(&dir) {
        Some(path) => Some(InterchangeInfo {
            records: file::count_records(&path)?,
            bytes: file::file_size(&path),
            path,
        }),
        None => None,
    };
    let logs = conflict::snapshot(layout.root(), false)?;

    let output = StatusOutput {
        project: layout.root().to_path_buf(),
        name: layout.name().to_string(),
        entries: store.entry_count()?,
        pending_import: status_label(pending),
        interchange,
        annotation_logs: logs.len(),
    };

    if json {
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("{}", "Project".cyan().bold());
    println!("  Name:    {}", output.name);
    println!("  Path:    {}", output.project.display());
    println!("  Entries: {}", output.entries);
    println!();
    println!("{}", "Lexicon repository".cyan().bold());
    match &output.interchange {
        Some(info) => {
            println!("  File:    {}", info.path.display());
            println!("  Records: {}", info.records);
            println!("  Size:    {} bytes", info.bytes);
        }
        None => println!("  File:    (none; run `lexsync export` or `lexsync obtain --lexicon`)"),
    }
    if pending == ImportStatus::NoImportNeeded {
        println!("  Pending: none");
    } else {
        println!(
            "  Pending: {}",
            status_label(pending).yellow().bold()
        );
    }
    println!();
    println!("  Annotation logs: {}", output.annotation_logs);
    Ok(())
}
