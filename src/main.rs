//! comfy-stack: provision, update and launch a ComfyUI workspace
//!
//! Parses the command line, loads layered configuration and hands one
//! command to the orchestrator.

use anyhow::Result;
use clap::Parser;
use std::io;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use comfy_stack::services::{CommandExecutor, DryRunExecutor, SystemExecutor};
use comfy_stack::{AppError, Cli, Orchestrator, ProvisionConfig};

/// Initialize logging with RUST_LOG environment variable support
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();
}

async fn run(cli: Cli) -> Result<i32> {
    let root = cli.workspace();
    let config = ProvisionConfig::load(Some(root.as_path())).map_err(AppError::from)?;
    let dry_run = cli.dry_run;
    let command = cli.into_command(&config)?;

    let executor: Box<dyn CommandExecutor> = if dry_run {
        Box::new(DryRunExecutor::new())
    } else {
        Box::new(SystemExecutor::new())
    };

    let orchestrator = Orchestrator::new(&config, executor.as_ref(), root);
    let code = orchestrator.run(&command).await?;
    Ok(code)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Interrupts between steps; the executor handles those during a step
    let result = tokio::select! {
        biased;
        _ = tokio::signal::ctrl_c() => Err(AppError::Interrupted.into()),
        res = run(cli) => res,
    };

    match result {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(err) => {
            if matches!(err.downcast_ref::<AppError>(), Some(AppError::Interrupted)) {
                tracing::error!("interrupted");
            } else {
                tracing::error!("{:#}", err);
            }
            ExitCode::from(1)
        }
    }
}
