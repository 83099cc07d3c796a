//! The synchronization state machines.
//!
//! Two flavors share one shape: quiesce the store, snapshot annotation
//! logs, hand the repository to the bridge, then reconcile whatever came
//! back. The primary flavor reloads the store from disk because the
//! bridge merged the database file itself; the lexicon flavor goes
//! through export before and merge-import after, with the failure
//! ledger guaranteeing a bad import is retried before anything else
//! touches the repository.
//!
//! Availability of the bridge executable is checked upstream by the CLI;
//! an orchestrator is only constructed once a bridge exists.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::PoisonError;

use uuid::Uuid;

use crate::bridge::{Bridge, BridgeRequest, BridgeVerb};
use crate::config::ProjectLayout;
use crate::conflict::{self, NotesSnapshot};
use crate::error::{Error, Result};
use crate::interchange::{self, Exporter, MergeImporter, MergeStyle};
use crate::ledger;
use crate::store::{RepoLock, SqliteLexicon};

use super::project_guard;

/// Receiver of sync side effects.
///
/// The orchestrator is the only component that signals; exporters,
/// importers, and the ledger stay silent so a failure surfaces exactly
/// once.
pub trait SyncNotifier {
    /// Local lexicon data changed and any open views are stale.
    fn on_data_changed(&self);

    /// A merge conflict was detected, optionally at a specific entry.
    fn on_conflict(&self, entry: Option<Uuid>);

    /// A non-fatal problem the user should read.
    fn on_warning(&self, message: &str);
}

/// Notifier that forwards everything to the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl SyncNotifier for LogNotifier {
    fn on_data_changed(&self) {
        tracing::info!("lexicon data changed");
    }

    fn on_conflict(&self, entry: Option<Uuid>) {
        match entry {
            Some(guid) => tracing::warn!(%guid, "merge conflict detected"),
            None => tracing::warn!("merge conflict detected"),
        }
    }

    fn on_warning(&self, message: &str) {
        tracing::warn!("{message}");
    }
}

/// Result of one sync attempt, after all signals have fired.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOutcome {
    /// The attempt ran to completion.
    pub succeeded: bool,
    /// Local data changed (pull applied, import succeeded, or a pending
    /// import was cleared).
    pub data_changed: bool,
    /// The annotation-log heuristic flagged a conflict.
    pub conflict: bool,
}

impl SyncOutcome {
    fn failed() -> Self {
        Self::default()
    }

    fn clean() -> Self {
        Self {
            succeeded: true,
            ..Self::default()
        }
    }
}

/// State captured before the bridge runs, consumed when it returns.
///
/// Kept as a value threaded through one attempt rather than a field on
/// the orchestrator, so two interleaved attempts can never read each
/// other's snapshot.
struct SyncAttempt {
    repo: PathBuf,
    snapshot: NotesSnapshot,
}

/// Sequences one project's sync operations against a bridge.
pub struct SyncOrchestrator<'a, B: Bridge> {
    bridge: &'a B,
    layout: &'a ProjectLayout,
    user_id: &'a str,
    notifier: &'a dyn SyncNotifier,
    writing_system: Option<&'a str>,
}

impl<'a, B: Bridge> SyncOrchestrator<'a, B> {
    #[must_use]
    pub fn new(
        bridge: &'a B,
        layout: &'a ProjectLayout,
        user_id: &'a str,
        notifier: &'a dyn SyncNotifier,
    ) -> Self {
        Self {
            bridge,
            layout,
            user_id,
            notifier,
            writing_system: None,
        }
    }

    /// Tag the bridge's lexicon verbs with the vernacular writing system.
    #[must_use]
    pub fn with_writing_system(mut self, writing_system: Option<&'a str>) -> Self {
        self.writing_system = writing_system;
        self
    }

    /// Synchronize the primary repository.
    ///
    /// The bridge merges the repository in place, so on a successful pull
    /// the store is reloaded from disk rather than imported.
    ///
    /// # Errors
    ///
    /// Returns an error for preconditions (hostile project name, store or
    /// lock failures). Bridge and merge problems are reported through the
    /// notifier and yield a failed [`SyncOutcome`] instead.
    pub fn send_receive(&self, store: &mut SqliteLexicon) -> Result<SyncOutcome> {
        let guard = project_guard(self.layout.root());
        let _one_at_a_time = guard.lock().unwrap_or_else(PoisonError::into_inner);
        self.layout.check_name()?;

        let lock = RepoLock::acquire(self.layout.root())?;
        store.flush()?;
        let attempt = SyncAttempt {
            repo: self.layout.root().to_path_buf(),
            snapshot: conflict::snapshot(self.layout.root(), true)?,
        };

        // The bridge takes its own lock on the repository.
        lock.release();
        let invoked = self.bridge.invoke(&BridgeRequest::new(
            &attempt.repo,
            self.user_id,
            BridgeVerb::SendReceive,
        ));
        let _lock = RepoLock::acquire(self.layout.root())?;

        let outcome = match invoked {
            Ok(outcome) => outcome,
            Err(e) => {
                self.notifier.on_warning(&format!("send/receive failed: {e}"));
                return Ok(SyncOutcome::failed());
            }
        };
        if !outcome.success {
            self.notifier
                .on_warning("send/receive did not complete; local data is unchanged");
            return Ok(SyncOutcome::failed());
        }
        if !outcome.data_changed {
            return Ok(SyncOutcome::clean());
        }

        let conflict = conflict::has_conflict(&attempt.repo, &attempt.snapshot, true)?;
        store.reload()?;
        self.notifier.on_data_changed();
        if conflict {
            self.notifier.on_conflict(None);
        }
        Ok(SyncOutcome {
            succeeded: true,
            data_changed: true,
            conflict,
        })
    }

    /// Synchronize the secondary lexicon repository.
    ///
    /// Order matters: any pending failed import is retried first (and
    /// blocks the attempt if it still fails), then the current lexicon is
    /// exported, then the bridge runs, then a pulled interchange file is
    /// mirror-imported.
    ///
    /// # Errors
    ///
    /// Same contract as [`Self::send_receive`].
    pub fn send_receive_lexicon(&self, store: &mut SqliteLexicon) -> Result<SyncOutcome> {
        let guard = project_guard(self.layout.root());
        let _one_at_a_time = guard.lock().unwrap_or_else(PoisonError::into_inner);
        self.layout.check_name()?;
        let dir = self.layout.lexicon_repo_dir();

        let lock = RepoLock::acquire(self.layout.root())?;
        let Some(retried) = self.retry_pending_import(store, &dir)? else {
            return Ok(SyncOutcome::failed());
        };

        store.flush()?;
        let exported = match Exporter::new(store, self.layout).export() {
            Ok(path) => path,
            Err(e) => {
                self.notifier
                    .on_warning(&format!("export failed, rolling the repository back: {e}"));
                let undo = self.lexicon_request(&dir, BridgeVerb::UndoExportLexicon);
                if let Err(undo_err) = self.bridge.invoke(&undo) {
                    self.notifier.on_warning(&format!("rollback failed: {undo_err}"));
                }
                return Ok(SyncOutcome {
                    data_changed: retried,
                    ..SyncOutcome::failed()
                });
            }
        };
        let attempt = SyncAttempt {
            repo: dir.clone(),
            snapshot: conflict::snapshot(&dir, false)?,
        };

        lock.release();
        let invoked = self
            .bridge
            .invoke(&self.lexicon_request(&attempt.repo, BridgeVerb::SendReceiveLexicon));
        let _lock = RepoLock::acquire(self.layout.root())?;

        let outcome = match invoked {
            Ok(outcome) => outcome,
            Err(e) => {
                self.notifier
                    .on_warning(&format!("lexicon send/receive failed: {e}"));
                return Ok(SyncOutcome {
                    data_changed: retried,
                    ..SyncOutcome::failed()
                });
            }
        };
        if !outcome.success {
            self.notifier
                .on_warning("lexicon send/receive did not complete; local data is unchanged");
            return Ok(SyncOutcome {
                data_changed: retried,
                ..SyncOutcome::failed()
            });
        }
        if !outcome.data_changed {
            return Ok(SyncOutcome {
                data_changed: retried,
                ..SyncOutcome::clean()
            });
        }

        let conflict = conflict::has_conflict(&attempt.repo, &attempt.snapshot, false)?;
        let pulled = outcome.result_path.unwrap_or(exported);
        let mut applied =
            self.apply_pulled_file(store, &dir, &pulled, MergeStyle::KeepOnlyNew, conflict)?;
        applied.data_changed |= retried;
        Ok(applied)
    }

    /// Clone a remote lexicon repository and union-import its contents.
    ///
    /// First contact trusts nothing about remote timestamps, so the union
    /// style keeps both sides wherever they diverge.
    ///
    /// # Errors
    ///
    /// Same contract as [`Self::send_receive`], plus
    /// [`Error::NoInterchangeFile`] when the clone produced no file.
    pub fn obtain_lexicon(&self, store: &mut SqliteLexicon) -> Result<SyncOutcome> {
        let guard = project_guard(self.layout.root());
        let _one_at_a_time = guard.lock().unwrap_or_else(PoisonError::into_inner);
        self.layout.check_name()?;
        let dir = self.layout.lexicon_repo_dir();
        fs::create_dir_all(self.layout.external_repos_dir())?;

        let invoked = self
            .bridge
            .invoke(&self.lexicon_request(&dir, BridgeVerb::ObtainLexicon));
        let _lock = RepoLock::acquire(self.layout.root())?;

        let outcome = match invoked {
            Ok(outcome) => outcome,
            Err(e) => {
                self.notifier.on_warning(&format!("obtain failed: {e}"));
                return Ok(SyncOutcome::failed());
            }
        };
        if !outcome.success {
            self.notifier.on_warning("obtain did not complete");
            return Ok(SyncOutcome::failed());
        }

        let pulled = outcome
            .result_path
            .or_else(|| interchange::discover_interchange_file(&dir))
            .ok_or_else(|| Error::NoInterchangeFile { dir: dir.clone() })?;
        self.apply_pulled_file(store, &dir, &pulled, MergeStyle::KeepBoth, false)
    }

    /// Clone a remote primary repository into the project root.
    ///
    /// The store arrives with the clone, so there is nothing to import;
    /// the caller opens it afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error for preconditions; bridge failures become
    /// notifier warnings and a failed outcome.
    pub fn obtain_project(&self) -> Result<SyncOutcome> {
        let guard = project_guard(self.layout.root());
        let _one_at_a_time = guard.lock().unwrap_or_else(PoisonError::into_inner);
        self.layout.check_name()?;
        fs::create_dir_all(self.layout.root())?;

        let invoked = self.bridge.invoke(&BridgeRequest::new(
            self.layout.root(),
            self.user_id,
            BridgeVerb::Obtain,
        ));
        match invoked {
            Ok(outcome) if outcome.success => {
                self.notifier.on_data_changed();
                Ok(SyncOutcome {
                    succeeded: true,
                    data_changed: true,
                    conflict: false,
                })
            }
            Ok(_) => {
                self.notifier.on_warning("obtain did not complete");
                Ok(SyncOutcome::failed())
            }
            Err(e) => {
                self.notifier.on_warning(&format!("obtain failed: {e}"));
                Ok(SyncOutcome::failed())
            }
        }
    }

    /// Ask the bridge whether the remote has anything new, without pulling.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BridgeFailed`] when the check itself could not run.
    pub fn check_for_updates(&self) -> Result<bool> {
        let outcome = self.bridge.invoke(&BridgeRequest::new(
            self.layout.root(),
            self.user_id,
            BridgeVerb::CheckForUpdates,
        ))?;
        if !outcome.success {
            return Err(Error::BridgeFailed {
                message: "update check did not complete".to_string(),
            });
        }
        Ok(outcome.data_changed)
    }

    /// Open the bridge's conflict viewer, optionally jumping to one entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BridgeFailed`] when the viewer could not start.
    pub fn view_conflicts(&self, lexicon: bool, entry: Option<Uuid>) -> Result<()> {
        let (repo, verb) = if lexicon {
            (self.layout.lexicon_repo_dir(), BridgeVerb::ConflictViewerLexicon)
        } else {
            (self.layout.root().to_path_buf(), BridgeVerb::ConflictViewer)
        };
        let guid = entry.map(|g| g.to_string());
        let mut request = BridgeRequest::new(&repo, self.user_id, verb);
        request.guid = guid.as_deref();
        if lexicon {
            request.writing_system = self.writing_system;
        }

        let outcome = self.bridge.invoke(&request)?;
        if !outcome.success {
            return Err(Error::BridgeFailed {
                message: "conflict viewer did not start".to_string(),
            });
        }
        Ok(())
    }

    /// One-time relocation of the lexicon repository into the project tree.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BridgeFailed`] when the move did not complete.
    pub fn move_lexicon_repo(&self) -> Result<()> {
        let dir = self.layout.lexicon_repo_dir();
        let outcome = self
            .bridge
            .invoke(&self.lexicon_request(&dir, BridgeVerb::MoveLexicon))?;
        if !outcome.success {
            return Err(Error::BridgeFailed {
                message: "repository move did not complete".to_string(),
            });
        }
        Ok(())
    }

    /// Show the bridge's version information.
    ///
    /// # Errors
    ///
    /// Returns an error when the bridge cannot be launched.
    pub fn about(&self) -> Result<()> {
        self.bridge.invoke(&BridgeRequest::new(
            self.layout.root(),
            self.user_id,
            BridgeVerb::About,
        ))?;
        Ok(())
    }

    /// Request for one of the lexicon verbs, tagged with the writing system.
    fn lexicon_request<'r>(&'r self, repo: &'r Path, verb: BridgeVerb) -> BridgeRequest<'r> {
        let mut request = BridgeRequest::new(repo, self.user_id, verb);
        request.writing_system = self.writing_system;
        request
    }

    /// Retry an import that failed on an earlier attempt.
    ///
    /// Returns `Some(true)` when the pending file was applied and local data
    /// changed, `Some(false)` when nothing was pending, and `None` when the
    /// import still fails; the caller must then abort so the unreconciled
    /// file is not exported over.
    fn retry_pending_import(
        &self,
        store: &mut SqliteLexicon,
        dir: &Path,
    ) -> Result<Option<bool>> {
        let Some(style) = ledger::get_status(dir)?.retry_style() else {
            return Ok(Some(false));
        };
        let file = interchange::discover_interchange_file(dir)
            .ok_or_else(|| Error::NoInterchangeFile {
                dir: dir.to_path_buf(),
            })?;
        tracing::info!(file = %file.display(), %style, "retrying pending import");

        match MergeImporter::new(store, self.layout, style).import(&file) {
            Ok(_) => {
                ledger::clear(dir)?;
                self.notifier.on_data_changed();
                Ok(Some(true))
            }
            Err(e) => {
                ledger::register_failure(dir, style)?;
                self.notifier.on_warning(&format!(
                    "pending import of {} ({style}) still fails: {e}",
                    file.display()
                ));
                Ok(None)
            }
        }
    }

    /// Import a file the bridge pulled, updating the failure ledger.
    fn apply_pulled_file(
        &self,
        store: &mut SqliteLexicon,
        dir: &Path,
        file: &Path,
        style: MergeStyle,
        conflict: bool,
    ) -> Result<SyncOutcome> {
        match MergeImporter::new(store, self.layout, style).import(file) {
            Ok(log) => {
                ledger::clear(dir)?;
                tracing::info!(log = %log.display(), "import applied");
                self.notifier.on_data_changed();
                if conflict {
                    self.notifier.on_conflict(None);
                }
                Ok(SyncOutcome {
                    succeeded: true,
                    data_changed: true,
                    conflict,
                })
            }
            Err(e) => {
                ledger::register_failure(dir, style)?;
                self.notifier.on_warning(&format!(
                    "import of {} ({style}) failed and will be retried on the next sync: {e}",
                    file.display()
                ));
                Ok(SyncOutcome {
                    succeeded: false,
                    data_changed: false,
                    conflict,
                })
            }
        }
    }
}
