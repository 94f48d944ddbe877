//! Codeplug manager CLI entry point.

use clap::Parser;
use cpm::cli::commands;
use cpm::cli::{Cli, Commands, OutputFormat};
use cpm::error::Error;
use cpm::model::CollectionKind;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.format == OutputFormat::Csv {
        cpm::CSV_OUTPUT.store(true, std::sync::atomic::Ordering::Relaxed);
    }
    if cli.no_color {
        colored::control::set_override(false);
    }

    // Set up tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    // Resolve effective JSON mode: --json OR --format json OR non-TTY stdout,
    // unless CSV was asked for explicitly
    let json = cli.json
        || cli.format == OutputFormat::Json
        || (cli.format != OutputFormat::Csv
            && !std::io::IsTerminal::is_terminal(&std::io::stdout()));

    // Run the command and handle errors
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
    let db = cli.db.as_ref();
    let actor = cli.actor.as_deref();

    match &cli.command {
        Commands::Init { force } => commands::init::execute(db, *force, json),
        Commands::Version => commands::version::execute(json),
        Commands::Completions { shell } => commands::completions::execute(shell),
        Commands::Status => commands::status::execute(db, json),

        // Transfer
        Commands::Import(args) => commands::import::execute(args, db, actor, json),
        Commands::Export(args) => commands::export::execute(args, db, actor, json),

        // Library
        Commands::Channel { command } => commands::channel::execute(command, db, actor, json),
        Commands::Zone { command } => {
            commands::zone::execute(CollectionKind::Zone, command, db, actor, json)
        }
        Commands::ScanList { command } => {
            commands::zone::execute(CollectionKind::ScanList, command, db, actor, json)
        }
        Commands::Contact { command } => commands::contact::execute(command, db, actor, json),

        // Directory
        Commands::Directory { command } => {
            commands::directory::execute(command, db, actor, json)
        }
        Commands::AllowList { command } => {
            commands::allowlist::execute(command, db, actor, json)
        }
    }
}
