//! Initialize a project.
//!
//! With a name, the project is created under the projects directory (or
//! under `--project` when given). Without one, the current directory (or
//! `--project`) becomes the project root. Either way an empty lexicon
//! store is created; the secondary repository appears later, on the
//! first export or obtain.

use std::fs;
use std::path::PathBuf;

use colored::Colorize;
use serde::Serialize;

use crate::config::{default_projects_root, ProjectLayout};
use crate::error::{Error, Result};
use crate::store::SqliteLexicon;

#[derive(Serialize)]
struct InitOutput {
    project: PathBuf,
    store: PathBuf,
}

/// Execute the init command.
///
/// # Errors
///
/// Returns [`Error::AlreadyInitialized`] when a store already exists at
/// the target, or an error if the directory or store cannot be created.
pub fn execute(name: Option<&str>, project: Option<&PathBuf>, json: bool) -> Result<()> {
    let root = match (name, project) {
        (Some(name), Some(base)) => base.join(name),
        (Some(name), None) => default_projects_root().join(name),
        (None, Some(base)) => base.clone(),
        (None, None) => std::env::current_dir()?,
    };

    let layout = ProjectLayout::new(root);
    layout.check_name()?;
    if layout.store_path().exists() {
        return Err(Error::AlreadyInitialized {
            path: layout.store_path(),
        });
    }

    fs::create_dir_all(layout.root())?;
    let store = SqliteLexicon::open(&layout.store_path())?;

    if json {
        let output = InitOutput {
            project: layout.root().to_path_buf(),
            store: store.path().to_path_buf(),
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!(
            "{} project {} at {}",
            "Initialized".green().bold(),
            layout.name(),
            layout.root().display()
        );
    }
    Ok(())
}
