mod cli;
mod commands;

use bow_core::BowError;
use clap::Parser;
use cli::{Cli, Commands};
use std::io::ErrorKind;
use std::process::ExitCode;

fn init_tracing(cli: &Cli) {
    // --quiet   -> "off"
    // --verbose -> RUST_LOG if set, otherwise "debug"
    // default   -> BOW_LOG_LEVEL if set, otherwise "warn"
    let filter = if cli.quiet {
        tracing_subscriber::EnvFilter::new("off")
    } else if cli.verbose {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "debug".into())
    } else {
        tracing_subscriber::EnvFilter::try_from_env("BOW_LOG_LEVEL")
            .unwrap_or_else(|_| "warn".into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        // Downstream closed early, e.g. `bow cat f.parquet | head`
        Err(e) if is_broken_pipe(&e) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Info(args) => commands::info(args),
        Commands::Cat(args) => commands::cat(args),
        Commands::Txt2par(args) => commands::txt2par(args),
    }
}

fn is_broken_pipe(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        if let Some(BowError::Io(e)) = cause.downcast_ref::<BowError>() {
            return e.kind() == ErrorKind::BrokenPipe;
        }
        cause
            .downcast_ref::<std::io::Error>()
            .is_some_and(|e| e.kind() == ErrorKind::BrokenPipe)
    })
}
