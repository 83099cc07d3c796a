//! Project layout and repository discovery.
//!
//! A lexsync project is a directory tree:
//!
//! ```text
//! <root>/                          primary repository (holds lexicon.db)
//! <root>/lexicon.notes             primary annotation log (optional)
//! <root>/ExternalRepositories/
//!     <project>_lexicon/           secondary repository
//!         <project>.lex            interchange file
//!         <project>.lex-ranges     auxiliary ranges file
//!         FAILED_IMPORT            failure marker (only after a bad import)
//! <root>/SyncLogs/                 human-readable import change logs
//! ```
//!
//! Discovery always prefers what is already on disk: an existing secondary
//! repository folder matching the `_lexicon` suffix is reused even when the
//! project has since been renamed, because constructing a fresh folder name
//! would silently create a duplicate repository.

use std::fs;
use std::path::{Path, PathBuf};

use directories::BaseDirs;

use crate::error::{Error, Result};

/// Subfolder of the project root holding secondary repositories.
pub const EXTERNAL_REPOS_DIR: &str = "ExternalRepositories";

/// Suffix identifying a secondary lexicon repository folder.
pub const LEXICON_REPO_SUFFIX: &str = "_lexicon";

/// File name of the SQLite lexicon store inside the primary repository.
pub const STORE_FILE: &str = "lexicon.db";

/// Primary annotation log covering the whole lexicon.
pub const PRIMARY_NOTES_FILE: &str = "lexicon.notes";

/// Directory for import change logs.
pub const SYNC_LOGS_DIR: &str = "SyncLogs";

/// Characters that cannot appear in a project name used as a folder name.
const HOSTILE_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Paths of one project: the primary repository root plus derived locations.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    root: PathBuf,
    name: String,
}

impl ProjectLayout {
    /// Describe a project rooted at `root`.
    ///
    /// The project name is the root directory's file name.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "lexicon".to_string());
        Self { root, name }
    }

    /// Primary repository root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Project name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the SQLite store inside the primary repository.
    #[must_use]
    pub fn store_path(&self) -> PathBuf {
        self.root.join(STORE_FILE)
    }

    /// Primary annotation log path (may not exist).
    #[must_use]
    pub fn primary_notes_path(&self) -> PathBuf {
        self.root.join(PRIMARY_NOTES_FILE)
    }

    /// Directory holding all secondary repositories.
    #[must_use]
    pub fn external_repos_dir(&self) -> PathBuf {
        self.root.join(EXTERNAL_REPOS_DIR)
    }

    /// Directory for import change logs.
    #[must_use]
    pub fn sync_logs_dir(&self) -> PathBuf {
        self.root.join(SYNC_LOGS_DIR)
    }

    /// Locate the secondary lexicon repository.
    ///
    /// An existing folder ending in [`LEXICON_REPO_SUFFIX`] is always reused,
    /// regardless of the current project name. Only when none exists is the
    /// expected `<name>_lexicon` path constructed (not created).
    #[must_use]
    pub fn lexicon_repo_dir(&self) -> PathBuf {
        if let Some(existing) = self.find_existing_lexicon_repo() {
            return existing;
        }
        self.external_repos_dir()
            .join(format!("{}{LEXICON_REPO_SUFFIX}", self.name))
    }

    fn find_existing_lexicon_repo(&self) -> Option<PathBuf> {
        let dir = self.external_repos_dir();
        let entries = fs::read_dir(&dir).ok()?;
        let mut candidates: Vec<PathBuf> = entries
            .filter_map(std::result::Result::ok)
            .map(|e| e.path())
            .filter(|p| {
                p.is_dir()
                    && p.file_name()
                        .is_some_and(|n| n.to_string_lossy().ends_with(LEXICON_REPO_SUFFIX))
            })
            .collect();
        // Lexicographic order keeps discovery deterministic.
        candidates.sort();
        candidates.into_iter().next()
    }

    /// Verify the project name can be used as a folder name everywhere.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidProjectName`] with a sanitized suggestion when
    /// the name contains filesystem-hostile characters. The project must be
    /// renamed (and the store reopened) before any sync attempt.
    pub fn check_name(&self) -> Result<()> {
        if self.name.chars().any(|c| HOSTILE_CHARS.contains(&c) || c.is_control()) {
            return Err(Error::InvalidProjectName {
                name: self.name.clone(),
                sanitized: sanitize_name(&self.name),
            });
        }
        Ok(())
    }
}

/// Replace filesystem-hostile characters in a project name with `-`.
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if HOSTILE_CHARS.contains(&c) || c.is_control() {
                '-'
            } else {
                c
            }
        })
        .collect()
}

/// Default directory under which projects live when `--project` is not given.
///
/// `~/.lexsync/projects/` on every platform `directories` supports; the
/// current directory as a last resort.
#[must_use]
pub fn default_projects_root() -> PathBuf {
    BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".lexsync").join("projects"))
        .unwrap_or_else(|| PathBuf::from("."))
}
