//! Error types for lexsync.
//!
//! Provides structured error handling with category-based exit codes
//! (2=store, 3=bridge, 4=validation, 5=export, 6=import, 8=io) and
//! context-aware recovery hints for CLI consumers.

use std::path::PathBuf;
use thiserror::Error;

use crate::interchange::MergeStyle;

/// Result type alias for lexsync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during lexicon synchronization.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not initialized: no lexicon store at {path}")]
    NotInitialized { path: PathBuf },

    #[error("Already initialized at {path}")]
    AlreadyInitialized { path: PathBuf },

    #[error("Bridge executable not found: {path}")]
    BridgeUnavailable { path: PathBuf },

    #[error("Bridge invocation failed: {message}")]
    BridgeFailed { message: String },

    #[error("Another bridge instance is already running for {repo}")]
    BridgeBusy { repo: PathBuf },

    #[error("Project name {name:?} contains characters unusable in file names")]
    InvalidProjectName {
        name: String,
        /// Safe replacement name the project can be renamed to.
        sanitized: String,
    },

    #[error("Export failed: {message}")]
    ExportFailed { message: String },

    #[error("Import of {file} ({style}) failed: {message}")]
    ImportFailed {
        file: PathBuf,
        style: MergeStyle,
        message: String,
    },

    #[error("Interchange file declares unsupported format version {found} (supported up to {supported})")]
    UnsupportedFormatVersion { found: u32, supported: u32 },

    #[error("Migration of {file} failed: {message}")]
    MigrationFailed { file: PathBuf, message: String },

    #[error("No interchange file found in {dir}")]
    NoInterchangeFile { dir: PathBuf },

    #[error("Invalid record at line {line}: {message}")]
    InvalidRecord { line: usize, message: String },

    #[error("Could not lock repository: {message}")]
    LockFailed { message: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Other(_) => 1,
            Self::NotInitialized { .. }
            | Self::AlreadyInitialized { .. }
            | Self::Database(_)
            | Self::LockFailed { .. } => 2,
            Self::BridgeUnavailable { .. } | Self::BridgeFailed { .. } | Self::BridgeBusy { .. } => 3,
            Self::InvalidProjectName { .. } | Self::InvalidRecord { .. } => 4,
            Self::ExportFailed { .. } => 5,
            Self::ImportFailed { .. }
            | Self::UnsupportedFormatVersion { .. }
            | Self::MigrationFailed { .. }
            | Self::NoInterchangeFile { .. } => 6,
            Self::Io(_) | Self::Json(_) => 8,
        }
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotInitialized { path } => Some(format!(
                "Run `lexsync init <name>` to create a lexicon store at {}",
                path.display()
            )),
            Self::BridgeUnavailable { path } => Some(format!(
                "Install the bridge tool or point --bridge (LEXSYNC_BRIDGE) at it; looked for {}",
                path.display()
            )),
            Self::BridgeBusy { .. } => {
                Some("Close the other synchronization window and try again.".to_string())
            }
            Self::InvalidProjectName { sanitized, .. } => Some(format!(
                "Rename the project to {sanitized:?} and reopen it before syncing."
            )),
            Self::ImportFailed { file, style, .. } => Some(format!(
                "The next sync attempt will retry importing {} with style {style} before anything else.",
                file.display()
            )),
            Self::NoInterchangeFile { dir } => Some(format!(
                "Run `lexsync obtain --lexicon` or `lexsync export` to create one in {}",
                dir.display()
            )),
            _ => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let mut obj = serde_json::json!({
            "error": {
                "message": self.to_string(),
                "exit_code": self.exit_code(),
            }
        });
        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }
        obj
    }
}
