//! Command implementations.

pub mod init;
pub mod status;
pub mod sync;
pub mod transfer;

use std::env;
use std::path::PathBuf;

use crate::bridge::{Bridge, ProcessBridge, DEFAULT_EXECUTABLE};
use crate::config::ProjectLayout;
use crate::error::{Error, Result};
use crate::store::SqliteLexicon;

/// Resolve the project layout from `--project` or the working directory.
pub(crate) fn resolve_layout(project: Option<&PathBuf>) -> Result<ProjectLayout> {
    let root = match project {
        Some(p) => p.clone(),
        None => env::current_dir()?,
    };
    Ok(ProjectLayout::new(root))
}

/// Open the project's store, failing when it was never initialized.
pub(crate) fn open_store(layout: &ProjectLayout) -> Result<SqliteLexicon> {
    SqliteLexicon::open_existing(&layout.store_path())
}

/// Identity string from `--user`, the environment, or a last resort.
pub(crate) fn resolve_user(user: Option<&str>) -> String {
    if let Some(user) = user {
        return user.to_string();
    }
    env::var("USER")
        .or_else(|_| env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Construct the bridge and verify it is installed.
pub(crate) fn resolve_bridge(executable: Option<&PathBuf>) -> Result<ProcessBridge> {
    let path = executable
        .cloned()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_EXECUTABLE));
    let bridge = ProcessBridge::new(path);
    if !bridge.is_available() {
        return Err(Error::BridgeUnavailable {
            path: bridge.executable().to_path_buf(),
        });
    }
    Ok(bridge)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_bridge_executable_is_rejected() {
        let path = PathBuf::from("/nonexistent/lexbridge");
        let err = resolve_bridge(Some(&path)).unwrap_err();
        assert!(matches!(err, Error::BridgeUnavailable { .. }));
    }

    #[test]
    fn explicit_user_wins_over_the_environment() {
        assert_eq!(resolve_user(Some("ana")), "ana");
    }
}
