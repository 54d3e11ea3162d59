//! calproxy entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use calproxy_core::{TracingConfig, init_tracing};
use calproxy_server::cli::{Cli, Command};
use calproxy_server::{AppState, ServerConfig, ServerResult, commands, server};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing_config = if cli.debug {
        TracingConfig::debug()
    } else {
        TracingConfig::server()
    }
    .with_format(cli.log_format);

    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "calproxy failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ServerResult<()> {
    let config = cli.apply(ServerConfig::load(cli.config.as_deref())?);

    match cli.command {
        Some(Command::Auth { force }) => commands::auth(&config, force).await,
        Some(Command::Serve) | None => {
            let state = AppState::from_config(&config)?;
            server::run(&config, state).await
        }
    }
}
