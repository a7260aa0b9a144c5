//! courtwatch entry point.

use std::process::ExitCode;

use clap::Parser;
use courtwatch_core::{TracingConfig, TracingOutputFormat, init_tracing};

use courtwatch_client::cli::Cli;
use courtwatch_client::config::ClientConfig;
use courtwatch_client::error::{ClientError, ClientResult};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "courtwatch stopped");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) -> ClientResult<()> {
    let mut config = if cli.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::default()
    };
    if let Some(ref format) = cli.log_format {
        let format: TracingOutputFormat = format.parse()?;
        config = config.with_format(format);
    }
    init_tracing(config)?;
    Ok(())
}

async fn run(cli: Cli) -> ClientResult<()> {
    let mut config = match cli.config {
        Some(ref path) => ClientConfig::load_from(path).map_err(ClientError::Config)?,
        None => ClientConfig::load().map_err(ClientError::Config)?,
    };
    cli.apply(&mut config);

    courtwatch_client::app::run(config).await
}
