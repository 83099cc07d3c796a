//! The external bridge: the executable performing distributed
//! version-control operations on a repository.
//!
//! lexsync treats the bridge as a black box invoked synchronously by verb.
//! The [`Bridge`] trait keeps the orchestrator testable; [`ProcessBridge`]
//! is the production implementation shelling out to the configured
//! executable.
//!
//! Process contract of the real tool:
//! - arguments: `-p <repo> -u <user> -v <verb>` plus optional `-g <guid>`,
//!   `--ws <writing-system>`, and the schema/protocol version pair
//! - stdout: `changed=true|false` and optionally `path=<file>` lines
//! - exit status 0 means success; any other status is a transport failure
//!   (including the "another instance is already running" case)

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Error, Result};
use crate::interchange::FORMAT_VERSION;

/// Protocol version spoken to the bridge.
pub const PROTOCOL_VERSION: &str = "0.5";

/// Default bridge executable name, resolved on PATH.
pub const DEFAULT_EXECUTABLE: &str = "lexbridge";

/// Companion tool the bridge requires for repository fix-ups.
pub const FIXUP_TOOL: &str = "lexbridge-fixup";

/// Operation requested from the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeVerb {
    /// Synchronize the primary repository.
    SendReceive,
    /// Clone a primary repository into a new local project.
    Obtain,
    /// Synchronize the secondary lexicon repository.
    SendReceiveLexicon,
    /// Clone a secondary lexicon repository.
    ObtainLexicon,
    /// One-time relocation of the lexicon repository.
    MoveLexicon,
    /// Roll back the most recent export in the lexicon repository.
    UndoExportLexicon,
    /// Check whether the remote has updates without pulling.
    CheckForUpdates,
    /// Show bridge version information.
    About,
    /// Open the conflict viewer for the primary repository.
    ConflictViewer,
    /// Open the conflict viewer for the lexicon repository.
    ConflictViewerLexicon,
}

impl BridgeVerb {
    /// Command-line verb string understood by the bridge.
    #[must_use]
    pub const fn as_arg(self) -> &'static str {
        match self {
            Self::SendReceive => "send_receive",
            Self::Obtain => "obtain",
            Self::SendReceiveLexicon => "send_receive_lexicon",
            Self::ObtainLexicon => "obtain_lexicon",
            Self::MoveLexicon => "move_lexicon",
            Self::UndoExportLexicon => "undo_export_lexicon",
            Self::CheckForUpdates => "check_for_updates",
            Self::About => "about",
            Self::ConflictViewer => "view_notes",
            Self::ConflictViewerLexicon => "view_notes_lexicon",
        }
    }
}

/// One bridge invocation.
#[derive(Debug, Clone)]
pub struct BridgeRequest<'a> {
    /// Repository the verb operates on.
    pub repo_path: &'a Path,
    /// Identity string recorded in version-control history.
    pub user_id: &'a str,
    /// Operation to perform.
    pub verb: BridgeVerb,
    /// Entity to jump to (conflict viewer verbs).
    pub guid: Option<&'a str>,
    /// Schema version of the data in the repository.
    pub schema_version: u32,
    /// Protocol version spoken to the bridge.
    pub protocol_version: &'a str,
    /// Vernacular writing system tag (lexicon verbs).
    pub writing_system: Option<&'a str>,
}

impl<'a> BridgeRequest<'a> {
    /// A request with the crate's current schema/protocol versions.
    #[must_use]
    pub fn new(repo_path: &'a Path, user_id: &'a str, verb: BridgeVerb) -> Self {
        Self {
            repo_path,
            user_id,
            verb,
            guid: None,
            schema_version: FORMAT_VERSION,
            protocol_version: PROTOCOL_VERSION,
            writing_system: None,
        }
    }
}

/// Out-values of a bridge invocation.
#[derive(Debug, Clone, Default)]
pub struct BridgeOutcome {
    /// Whether the verb completed.
    pub success: bool,
    /// Whether local data changed (pull applied something).
    pub data_changed: bool,
    /// Discovered interchange file, for obtain/lexicon flows.
    pub result_path: Option<PathBuf>,
}

/// Strategy interface over the external tool, selected at startup.
pub trait Bridge {
    /// Run one verb, blocking until the bridge exits.
    ///
    /// # Errors
    ///
    /// Returns an error when the process cannot be launched at all;
    /// in-protocol failures come back as `success: false`.
    fn invoke(&self, request: &BridgeRequest<'_>) -> Result<BridgeOutcome>;

    /// Whether the bridge and its companion fix-up tool are installed.
    fn is_available(&self) -> bool;
}

/// Production bridge invoking the external executable.
#[derive(Debug, Clone)]
pub struct ProcessBridge {
    executable: PathBuf,
    fixup_tool: PathBuf,
}

impl ProcessBridge {
    /// Bridge using `executable`, with the fix-up tool beside it.
    #[must_use]
    pub fn new(executable: PathBuf) -> Self {
        let fixup_tool = executable
            .parent()
            .map_or_else(|| PathBuf::from(FIXUP_TOOL), |dir| dir.join(FIXUP_TOOL));
        Self {
            executable,
            fixup_tool,
        }
    }

    /// Executable path this bridge invokes.
    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

impl Bridge for ProcessBridge {
    fn invoke(&self, request: &BridgeRequest<'_>) -> Result<BridgeOutcome> {
        let mut cmd = Command::new(&self.executable);
        cmd.arg("-p")
            .arg(request.repo_path)
            .args(["-u", request.user_id])
            .args(["-v", request.verb.as_arg()])
            .args(["--schema", &request.schema_version.to_string()])
            .args(["--protocol", request.protocol_version]);
        if let Some(guid) = request.guid {
            cmd.args(["-g", guid]);
        }
        if let Some(ws) = request.writing_system {
            cmd.args(["--ws", ws]);
        }

        tracing::info!(
            verb = request.verb.as_arg(),
            repo = %request.repo_path.display(),
            "invoking bridge"
        );
        let output = cmd.output().map_err(|e| Error::BridgeFailed {
            message: format!("could not launch {}: {e}", self.executable.display()),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            // A second bridge instance holds the single-instance mutex and
            // exits with this message.
            if stderr.contains("already running") || stdout.contains("already running") {
                return Err(Error::BridgeBusy {
                    repo: request.repo_path.to_path_buf(),
                });
            }
            return Ok(BridgeOutcome {
                success: false,
                data_changed: false,
                result_path: None,
            });
        }

        let mut outcome = BridgeOutcome {
            success: true,
            ..BridgeOutcome::default()
        };
        for line in stdout.lines() {
            if let Some(flag) = line.strip_prefix("changed=") {
                outcome.data_changed = flag.trim() == "true";
            } else if let Some(path) = line.strip_prefix("path=") {
                let path = path.trim();
                if !path.is_empty() {
                    outcome.result_path = Some(PathBuf::from(path));
                }
            }
        }
        Ok(outcome)
    }

    fn is_available(&self) -> bool {
        resolve_on_path(&self.executable) && resolve_on_path(&self.fixup_tool)
    }
}

/// Whether a program exists: as given, or somewhere on PATH when the name
/// is bare.
fn resolve_on_path(program: &Path) -> bool {
    if program.components().count() > 1 {
        return program.exists();
    }
    let Some(paths) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&paths).any(|dir| dir.join(program).exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbs_map_to_stable_arguments() {
        assert_eq!(BridgeVerb::SendReceive.as_arg(), "send_receive");
        assert_eq!(
            BridgeVerb::UndoExportLexicon.as_arg(),
            "undo_export_lexicon"
        );
        assert_eq!(BridgeVerb::ConflictViewerLexicon.as_arg(), "view_notes_lexicon");
    }

    #[test]
    fn request_defaults_carry_current_versions() {
        let repo = PathBuf::from("/repo");
        let req = BridgeRequest::new(&repo, "ana", BridgeVerb::SendReceive);
        assert_eq!(req.schema_version, FORMAT_VERSION);
        assert_eq!(req.protocol_version, PROTOCOL_VERSION);
        assert!(req.guid.is_none());
    }

    #[test]
    fn missing_executable_is_unavailable() {
        let bridge = ProcessBridge::new(PathBuf::from("/nonexistent/lexbridge"));
        assert!(!bridge.is_available());
    }

    #[test]
    fn launch_failure_is_a_bridge_error() {
        let bridge = ProcessBridge::new(PathBuf::from("/nonexistent/lexbridge"));
        let repo = PathBuf::from("/repo");
        let req = BridgeRequest::new(&repo, "ana", BridgeVerb::About);
        assert!(matches!(
            bridge.invoke(&req),
            Err(Error::BridgeFailed { .. })
        ));
    }
}
