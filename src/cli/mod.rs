//! CLI definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

pub mod commands;

/// lexsync - lexicon repository synchronization
#[derive(Parser, Debug)]
#[command(name = "lexsync", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project root directory (default: current directory)
    #[arg(long, global = true, env = "LEXSYNC_PROJECT")]
    pub project: Option<PathBuf>,

    /// Identity recorded in version-control history
    #[arg(long, global = true, env = "LEXSYNC_USER")]
    pub user: Option<String>,

    /// Bridge executable (default: lexbridge on PATH)
    #[arg(long, global = true, env = "LEXSYNC_BRIDGE")]
    pub bridge: Option<PathBuf>,

    /// Vernacular writing system tag passed to the bridge's lexicon verbs
    #[arg(long, global = true, env = "LEXSYNC_WS")]
    pub writing_system: Option<String>,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a project with an empty lexicon store
    Init {
        /// Project name (created under the projects directory)
        name: Option<String>,
    },

    /// Synchronize with the remote repository
    SendReceive {
        /// Operate on the secondary lexicon repository
        #[arg(long)]
        lexicon: bool,
    },

    /// Clone a remote repository into this project
    Obtain {
        /// Clone the secondary lexicon repository
        #[arg(long)]
        lexicon: bool,
    },

    /// Ask whether the remote has updates, without pulling
    CheckUpdates,

    /// Open the bridge's conflict viewer
    Conflicts {
        /// View conflicts of the secondary lexicon repository
        #[arg(long)]
        lexicon: bool,

        /// Entry to jump to
        #[arg(long)]
        entry: Option<Uuid>,
    },

    /// Write the interchange file from the local store
    Export,

    /// Merge an interchange file into the local store
    Import {
        /// Interchange file to import
        file: PathBuf,

        /// Union merge (keep both sides) instead of mirroring the file
        #[arg(long)]
        keep_both: bool,
    },

    /// Show store, repository, and pending-import state
    Status,

    /// Show bridge version information
    About,

    /// Relocate the lexicon repository into the project tree
    MoveRepo,
}
