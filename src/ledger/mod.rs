//! Crash-safe persistence of import failure state.
//!
//! When an import of the interchange file fails, local and remote are not
//! reconciled even though the bridge believes the pull was delivered. That
//! fact must survive a process restart, so it is recorded as a marker file
//! inside the secondary repository and re-checked at the start of every
//! sync attempt.
//!
//! The marker's *content*, not just its existence, encodes the severity:
//! callers must never infer severity from presence alone.

use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::interchange::MergeStyle;

/// Fixed name of the marker file inside the secondary repository.
pub const MARKER_FILE: &str = "FAILED_IMPORT";

const BASIC_CONTENT: &str = "import failure: keep both";
const STANDARD_CONTENT: &str = "import failure: keep only new";

/// Import obligation recorded by the last failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStatus {
    /// No pending import; the last attempt (if any) succeeded.
    NoImportNeeded,
    /// A first-time/union (`KeepBoth`) import failed and must be retried.
    BasicImportNeeded,
    /// A routine mirror (`KeepOnlyNew`) import failed; it must be retried
    /// with the same file and style before any further sync.
    StandardImportNeeded,
}

impl ImportStatus {
    /// The merge style a retry must use, if one is pending.
    #[must_use]
    pub fn retry_style(self) -> Option<MergeStyle> {
        match self {
            Self::NoImportNeeded => None,
            Self::BasicImportNeeded => Some(MergeStyle::KeepBoth),
            Self::StandardImportNeeded => Some(MergeStyle::KeepOnlyNew),
        }
    }
}

/// Severity to record for a failure under the given merge style.
#[must_use]
pub fn severity_for(style: MergeStyle) -> ImportStatus {
    match style {
        MergeStyle::KeepBoth => ImportStatus::BasicImportNeeded,
        MergeStyle::KeepOnlyNew => ImportStatus::StandardImportNeeded,
    }
}

/// Read the pending-import status recorded in `dir`.
///
/// Absence of the marker means no import is needed. Unrecognized content
/// is treated as the conservative `StandardImportNeeded`.
///
/// # Errors
///
/// Returns an error if the marker exists but cannot be read.
pub fn get_status(dir: &Path) -> Result<ImportStatus> {
    let marker = dir.join(MARKER_FILE);
    if !marker.exists() {
        return Ok(ImportStatus::NoImportNeeded);
    }
    let content = fs::read_to_string(&marker)?;
    if content.trim() == BASIC_CONTENT {
        Ok(ImportStatus::BasicImportNeeded)
    } else {
        Ok(ImportStatus::StandardImportNeeded)
    }
}

/// Record a failed import at the severity matching `style`.
///
/// Overwrites any prior marker.
///
/// # Errors
///
/// Returns an error if the marker cannot be written.
pub fn register_failure(dir: &Path, style: MergeStyle) -> Result<()> {
    fs::create_dir_all(dir)?;
    let content = match severity_for(style) {
        ImportStatus::BasicImportNeeded => BASIC_CONTENT,
        _ => STANDARD_CONTENT,
    };
    fs::write(dir.join(MARKER_FILE), content)?;
    tracing::warn!(dir = %dir.display(), style = %style, "recorded import failure marker");
    Ok(())
}

/// Delete the marker after a successful import. A missing marker is fine.
///
/// # Errors
///
/// Returns an error if the marker exists but cannot be removed.
pub fn clear(dir: &Path) -> Result<()> {
    let marker = dir.join(MARKER_FILE);
    if marker.exists() {
        fs::remove_file(&marker)?;
        tracing::debug!(dir = %dir.display(), "cleared import failure marker");
    }
    Ok(())
}
