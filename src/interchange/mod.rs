//! Interchange file operations.
//!
//! The interchange file is the portable serialized lexicon exchanged
//! through the secondary repository. Format:
//!
//! ```text
//! {"format_version":2}
//! {"entry":{"guid":"...","lemma":"pintu",...},"content_hash":"..."}
//! {"entry":{"guid":"...","lemma":"rumah",...},"content_hash":"..."}
//! ```
//!
//! Line 1 is the header; every following line is one entry record, sorted
//! by guid. The sort is load-bearing: the version-control tool diffs these
//! files, so re-exporting unchanged data must produce byte-identical
//! output.
//!
//! - [`export`] - Exporter (store -> interchange + ranges files)
//! - [`import`] - MergeImporter (interchange -> store under a merge style)
//! - [`migrate`] - older format versions -> current
//! - [`file`] - atomic writes and line-oriented record I/O
//! - [`hash`] - content hashing for change detection

pub mod export;
pub mod file;
pub mod hash;
pub mod import;
pub mod migrate;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::LexEntry;

pub use export::Exporter;
pub use import::{ImportStats, MergeImporter};
pub use migrate::migrate_to_current;

/// Current interchange format version.
pub const FORMAT_VERSION: u32 = 2;

/// Extension of the interchange file.
pub const INTERCHANGE_EXTENSION: &str = "lex";

/// Extension of the auxiliary ranges file.
pub const RANGES_EXTENSION: &str = "lex-ranges";

/// First line of every interchange file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Declared format version of the records that follow.
    pub format_version: u32,
}

/// One entry line of the interchange file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryRecord {
    /// The entry data.
    pub entry: LexEntry,
    /// SHA256 hash of the serialized entry (for change detection).
    pub content_hash: String,
}

impl EntryRecord {
    /// Wrap an entry, computing its content hash.
    #[must_use]
    pub fn new(entry: LexEntry) -> Self {
        let content_hash = hash::content_hash(&entry);
        Self {
            entry,
            content_hash,
        }
    }
}

/// Policy governing how an import reconciles local vs. file entries.
///
/// Never persisted; chosen per sync operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStyle {
    /// Union: file entries are created or updated, local-only entries kept.
    KeepBoth,
    /// Mirror: the store is made to match the file exactly; local entries
    /// absent from the file are deleted.
    KeepOnlyNew,
}

impl fmt::Display for MergeStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeepBoth => write!(f, "keep-both"),
            Self::KeepOnlyNew => write!(f, "keep-only-new"),
        }
    }
}

/// Find the interchange file inside a secondary repository.
///
/// First `*.lex` file in lexicographic order wins; its existence implies
/// the repository has been initialized at least once.
#[must_use]
pub fn discover_interchange_file(dir: &Path) -> Option<PathBuf> {
    let entries = fs::read_dir(dir).ok()?;
    let mut candidates: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.is_file() && p.extension().is_some_and(|ext| ext == INTERCHANGE_EXTENSION)
        })
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}

/// Path of the ranges file that accompanies an interchange file.
#[must_use]
pub fn ranges_path(interchange: &Path) -> PathBuf {
    interchange.with_extension(RANGES_EXTENSION)
}
