//! calbot CLI entry point.

use std::process::ExitCode;

use calbot_core::{TracingConfig, init_tracing};
use clap::Parser;
use tracing::Level;

use calbot_cli::cli::{Cli, Command, ConfigAction};
use calbot_cli::commands;
use calbot_cli::config::ClientConfig;
use calbot_cli::error::{ClientError, ClientResult};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut tracing = if cli.debug {
        TracingConfig::cli_debug()
    } else if matches!(cli.command, Command::Serve { .. }) {
        TracingConfig::daemon()
    } else {
        TracingConfig::default().with_level(Level::WARN)
    };
    if let Some(format) = cli.log_format {
        tracing = tracing.with_format(format.into());
    }
    if let Err(e) = init_tracing(tracing) {
        eprintln!("warning: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config = match cli.config {
        Some(ref path) => ClientConfig::load_from(path).map_err(ClientError::Config)?,
        None => ClientConfig::load().map_err(ClientError::Config)?,
    };

    match cli.command {
        Command::Extract {
            source,
            anchor,
            format,
        } => commands::extract::run(&config, source, anchor, format).await,
        Command::Serve { address } => commands::serve::run(&config, address).await,
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config),
            ConfigAction::Path => commands::config::path(),
        },
    }
}
