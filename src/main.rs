//! lexsync CLI entry point.

use clap::Parser;
use lexsync::cli::{commands, Cli, Commands};
use lexsync::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    // Effective JSON mode: --json OR non-TTY stdout
    let json = cli.json || !std::io::IsTerminal::is_terminal(&std::io::stdout());

    match run(&cli, json) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                eprintln!("{}", e.to_structured_json());
            } else if !cli.quiet {
                if let Some(hint) = e.hint() {
                    eprintln!("Error: {e}\n  Hint: {hint}");
                } else {
                    eprintln!("Error: {e}");
                }
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug,rusqlite=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli, json: bool) -> Result<(), Error> {
    match &cli.command {
        Commands::Init { name } => {
            commands::init::execute(name.as_deref(), cli.project.as_ref(), json)
        }
        Commands::SendReceive { lexicon } => commands::sync::send_receive(cli, *lexicon, json),
        Commands::Obtain { lexicon } => commands::sync::obtain(cli, *lexicon, json),
        Commands::CheckUpdates => commands::sync::check_updates(cli, json),
        Commands::Conflicts { lexicon, entry } => {
            commands::sync::conflicts(cli, *lexicon, *entry)
        }
        Commands::Export => commands::transfer::export(cli, json),
        Commands::Import { file, keep_both } => {
            commands::transfer::import(cli, file, *keep_both, json)
        }
        Commands::Status => commands::status::execute(cli, json),
        Commands::About => commands::sync::about(cli),
        Commands::MoveRepo => commands::sync::move_repo(cli, json),
    }
}
