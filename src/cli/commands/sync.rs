//! Bridge-backed sync command implementations.
//!
//! Every command here builds a [`ProcessBridge`], verifies it is
//! installed, and hands control to the [`SyncOrchestrator`]. Warnings
//! and change notifications surface through a console notifier so the
//! orchestrator itself stays UI-free.

use colored::Colorize;
use uuid::Uuid;

use crate::cli::Cli;
use crate::error::Result;
use crate::sync::{SyncNotifier, SyncOrchestrator, SyncOutcome};

/// Notifier printing to the console (warnings to stderr).
struct ConsoleNotifier {
    json: bool,
}

impl SyncNotifier for ConsoleNotifier {
    fn on_data_changed(&self) {
        if !self.json {
            println!("{}", "Local lexicon updated.".green());
        }
    }

    fn on_conflict(&self, entry: Option<Uuid>) {
        let at = entry.map_or_else(String::new, |g| format!(" at entry {g}"));
        eprintln!(
            "{} merge conflict detected{at}; run `lexsync conflicts` to review",
            "Conflict:".yellow().bold()
        );
    }

    fn on_warning(&self, message: &str) {
        eprintln!("{} {message}", "Warning:".yellow().bold());
    }
}

fn report(outcome: SyncOutcome, json: bool) -> Result<()> {
    if json {
        let output = serde_json::json!({
            "succeeded": outcome.succeeded,
            "data_changed": outcome.data_changed,
            "conflict": outcome.conflict,
        });
        println!("{output}");
    } else if outcome.succeeded && !outcome.data_changed {
        println!("Up to date.");
    } else if outcome.succeeded {
        println!("{}", "Sync complete.".green().bold());
    } else {
        println!("{}", "Sync did not complete.".red().bold());
    }
    Ok(())
}

/// Execute `send-receive`, for either repository flavor.
pub fn send_receive(cli: &Cli, lexicon: bool, json: bool) -> Result<()> {
    let layout = super::resolve_layout(cli.project.as_ref())?;
    let bridge = super::resolve_bridge(cli.bridge.as_ref())?;
    let user = super::resolve_user(cli.user.as_deref());
    let mut store = super::open_store(&layout)?;

    let notifier = ConsoleNotifier { json };
    let orch = SyncOrchestrator::new(&bridge, &layout, &user, &notifier)
        .with_writing_system(cli.writing_system.as_deref());
    let outcome = if lexicon {
        orch.send_receive_lexicon(&mut store)?
    } else {
        orch.send_receive(&mut store)?
    };
    report(outcome, json)
}

/// Execute `obtain`, for either repository flavor.
pub fn obtain(cli: &Cli, lexicon: bool, json: bool) -> Result<()> {
    let layout = super::resolve_layout(cli.project.as_ref())?;
    let bridge = super::resolve_bridge(cli.bridge.as_ref())?;
    let user = super::resolve_user(cli.user.as_deref());

    let notifier = ConsoleNotifier { json };
    let orch = SyncOrchestrator::new(&bridge, &layout, &user, &notifier)
        .with_writing_system(cli.writing_system.as_deref());
    let outcome = if lexicon {
        let mut store = super::open_store(&layout)?;
        orch.obtain_lexicon(&mut store)?
    } else {
        orch.obtain_project()?
    };
    report(outcome, json)
}

/// Execute `check-updates`.
pub fn check_updates(cli: &Cli, json: bool) -> Result<()> {
    let layout = super::resolve_layout(cli.project.as_ref())?;
    let bridge = super::resolve_bridge(cli.bridge.as_ref())?;
    let user = super::resolve_user(cli.user.as_deref());

    let notifier = ConsoleNotifier { json };
    let orch = SyncOrchestrator::new(&bridge, &layout, &user, &notifier);
    let updates = orch.check_for_updates()?;

    if json {
        println!("{}", serde_json::json!({ "updates_available": updates }));
    } else if updates {
        println!("{}", "Updates are available.".green().bold());
    } else {
        println!("Up to date.");
    }
    Ok(())
}

/// Execute `conflicts`: open the bridge's conflict viewer.
pub fn conflicts(cli: &Cli, lexicon: bool, entry: Option<Uuid>) -> Result<()> {
    let layout = super::resolve_layout(cli.project.as_ref())?;
    let bridge = super::resolve_bridge(cli.bridge.as_ref())?;
    let user = super::resolve_user(cli.user.as_deref());

    let notifier = ConsoleNotifier { json: false };
    let orch = SyncOrchestrator::new(&bridge, &layout, &user, &notifier)
        .with_writing_system(cli.writing_system.as_deref());
    orch.view_conflicts(lexicon, entry)
}

/// Execute `move-repo`.
pub fn move_repo(cli: &Cli, json: bool) -> Result<()> {
    let layout = super::resolve_layout(cli.project.as_ref())?;
    let bridge = super::resolve_bridge(cli.bridge.as_ref())?;
    let user = super::resolve_user(cli.user.as_deref());

    let notifier = ConsoleNotifier { json };
    let orch = SyncOrchestrator::new(&bridge, &layout, &user, &notifier)
        .with_writing_system(cli.writing_system.as_deref());
    orch.move_lexicon_repo()?;

    if json {
        println!("{}", serde_json::json!({ "moved": true }));
    } else {
        println!(
            "Lexicon repository now at {}",
            layout.lexicon_repo_dir().display()
        );
    }
    Ok(())
}

/// Execute `about`: let the bridge print its version information.
pub fn about(cli: &Cli) -> Result<()> {
    let layout = super::resolve_layout(cli.project.as_ref())?;
    let bridge = super::resolve_bridge(cli.bridge.as_ref())?;
    let user = super::resolve_user(cli.user.as_deref());

    let notifier = ConsoleNotifier { json: false };
    let orch = SyncOrchestrator::new(&bridge, &layout, &user, &notifier);
    orch.about()
}
