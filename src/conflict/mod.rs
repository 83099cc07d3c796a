//! Heuristic conflict detection over annotation logs.
//!
//! Annotation logs (`.notes` files) are append-only by convention: the
//! merge machinery in the bridge records every conflict it hit by
//! appending to one. So "did any log change size across the bridge
//! invocation" is a usable conflict signal without parsing log content.
//!
//! The heuristic is deliberately imprecise and kept that way for
//! compatibility: an in-place edit that preserves length goes unnoticed,
//! and growth from a benign note is reported as a conflict. See the tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::EXTERNAL_REPOS_DIR;
use crate::error::Result;

/// Extension of annotation log files.
pub const NOTES_EXTENSION: &str = "notes";

/// Map from annotation-log path to its byte length.
pub type NotesSnapshot = BTreeMap<PathBuf, u64>;

fn is_notes_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == NOTES_EXTENSION)
}

fn in_secondary(root: &Path, path: &Path) -> bool {
    path.strip_prefix(root)
        .ok()
        .and_then(|rel| rel.components().next())
        .is_some_and(|first| first.as_os_str() == EXTERNAL_REPOS_DIR)
}

fn walk_notes(root: &Path, exclude_secondary: bool) -> impl Iterator<Item = PathBuf> + '_ {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .map(walkdir::DirEntry::into_path)
        .filter(|p| p.is_file() && is_notes_file(p))
        .filter(move |p| !(exclude_secondary && in_secondary(root, p)))
}

/// Record the byte length of every annotation log under `root`.
///
/// With `exclude_secondary`, logs living under the external-repositories
/// subfolder are skipped, so the primary-repository detector never reports
/// on logs that belong to the interchange flow.
///
/// # Errors
///
/// Returns an error if a discovered log's metadata cannot be read.
pub fn snapshot(root: &Path, exclude_secondary: bool) -> Result<NotesSnapshot> {
    let mut sizes = NotesSnapshot::new();
    for path in walk_notes(root, exclude_secondary) {
        let len = std::fs::metadata(&path)?.len();
        sizes.insert(path, len);
    }
    tracing::debug!(root = %root.display(), logs = sizes.len(), "annotation log snapshot");
    Ok(sizes)
}

/// Decide whether any annotation log changed since `before`.
///
/// Re-walks the same file set; any log whose current length differs from
/// its snapshot length, or that newly appeared, is a conflict signal. The
/// walk short-circuits on the first such file.
///
/// # Errors
///
/// Returns an error if a discovered log's metadata cannot be read.
pub fn has_conflict(root: &Path, before: &NotesSnapshot, exclude_secondary: bool) -> Result<bool> {
    for path in walk_notes(root, exclude_secondary) {
        let len = std::fs::metadata(&path)?.len();
        match before.get(&path) {
            Some(&old) if old == len => {}
            Some(_) | None => {
                tracing::info!(log = %path.display(), "annotation log changed, treating as conflict");
                return Ok(true);
            }
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn unchanged_logs_report_no_conflict() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("lexicon.notes"), "one\n").unwrap();
        fs::create_dir_all(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("sub/entry.notes"), "two\n").unwrap();

        let before = snapshot(tmp.path(), true).unwrap();
        assert_eq!(before.len(), 2);
        assert!(!has_conflict(tmp.path(), &before, true).unwrap());
    }

    #[test]
    fn grown_log_is_a_conflict() {
        let tmp = TempDir::new().unwrap();
        let log = tmp.path().join("lexicon.notes");
        fs::write(&log, "one\n").unwrap();

        let before = snapshot(tmp.path(), true).unwrap();
        fs::write(&log, "one\nconflict appended\n").unwrap();
        assert!(has_conflict(tmp.path(), &before, true).unwrap());
    }

    #[test]
    fn new_log_is_a_conflict() {
        let tmp = TempDir::new().unwrap();
        let before = snapshot(tmp.path(), true).unwrap();
        fs::write(tmp.path().join("fresh.notes"), "x\n").unwrap();
        assert!(has_conflict(tmp.path(), &before, true).unwrap());
    }

    // Documents the known imprecision of the size heuristic rather than
    // fixing it: a same-length rewrite is invisible.
    #[test]
    fn same_size_change_is_not_flagged() {
        let tmp = TempDir::new().unwrap();
        let log = tmp.path().join("lexicon.notes");
        fs::write(&log, "aaaa\n").unwrap();

        let before = snapshot(tmp.path(), true).unwrap();
        fs::write(&log, "bbbb\n").unwrap();
        assert!(!has_conflict(tmp.path(), &before, true).unwrap());
    }

    #[test]
    fn secondary_logs_are_excluded_when_asked() {
        let tmp = TempDir::new().unwrap();
        let secondary = tmp.path().join(EXTERNAL_REPOS_DIR).join("kamus_lexicon");
        fs::create_dir_all(&secondary).unwrap();
        let log = secondary.join("kamus.lex.notes");
        fs::write(&log, "one\n").unwrap();

        let before = snapshot(tmp.path(), true).unwrap();
        assert!(before.is_empty());

        fs::write(&log, "one\ntwo\n").unwrap();
        assert!(!has_conflict(tmp.path(), &before, true).unwrap());

        // The lexicon-flavor detector walks the secondary repo directly.
        let before = snapshot(&secondary, false).unwrap();
        fs::write(&log, "one\ntwo\nthree\n").unwrap();
        assert!(has_conflict(&secondary, &before, false).unwrap());
    }

    #[test]
    fn non_notes_files_are_ignored() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("lexicon.db"), "binary").unwrap();

        let before = snapshot(tmp.path(), true).unwrap();
        assert!(before.is_empty());
        fs::write(tmp.path().join("lexicon.db"), "binary grown").unwrap();
        assert!(!has_conflict(tmp.path(), &before, true).unwrap());
    }
}
