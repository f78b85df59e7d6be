//! CLI entry point - the composition root.
//!
//! This is the ONLY place where infrastructure is wired together via bootstrap.
//! Errors carrying a [`CliError`] exit with its code; anything else exits with 1.

use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use readaloud_cli::handlers::read::ReadOptions;
use readaloud_cli::{Cli, CliConfig, CliError, bootstrap, handlers};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            let code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

/// Install the log subscriber. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Bootstrap the CLI context (composition root)
    let config = CliConfig::from_cli(&cli)?;
    let ctx = bootstrap(config)?;

    if cli.list_voices {
        return handlers::voices::execute(&ctx, cli.backend).await;
    }

    let Some(file) = cli.file else {
        Cli::command().print_help()?;
        return Ok(());
    };

    handlers::read::execute(
        &ctx,
        ReadOptions {
            file,
            plain: cli.plain,
            start: cli.start.map(|n| n - 1),
            backend: cli.backend,
            voice: cli.voice,
            speed: cli.speed,
        },
    )
    .await
}
