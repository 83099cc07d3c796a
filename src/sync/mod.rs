//! Synchronization orchestration.
//!
//! [`orchestrator::SyncOrchestrator`] sequences bridge invocation, export,
//! import, conflict detection, and failure recovery for each repository
//! flavor. See that module for the state machines.

pub mod orchestrator;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

pub use orchestrator::{LogNotifier, SyncNotifier, SyncOrchestrator, SyncOutcome};

/// Per-project mutex registry.
///
/// No two sync attempts for the same project may be in flight at once.
/// The original environment enforced this through its single-window UI;
/// here it is explicit.
pub(crate) fn project_guard(root: &Path) -> Arc<Mutex<()>> {
    static GUARDS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();
    let registry = GUARDS.get_or_init(|| Mutex::new(HashMap::new()));
    let mut map = registry
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    map.entry(root.to_path_buf())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_root_shares_a_guard() {
        let a = project_guard(Path::new("/projects/kamus"));
        let b = project_guard(Path::new("/projects/kamus"));
        assert!(Arc::ptr_eq(&a, &b));

        let other = project_guard(Path::new("/projects/other"));
        assert!(!Arc::ptr_eq(&a, &other));
    }
}
