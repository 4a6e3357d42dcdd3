use anyhow::{Context, Result};
use clap::Parser;
use karatos_ci::cli::{Cli, Commands, RunArgs};
use karatos_ci::config::CiConfig;
use karatos_ci::docker::{DockerCi, DockerCommand};
use karatos_ci::pipeline::Pipeline;
use std::path::Path;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let code = match cli.command {
        None => run(&cli.run).await?,
        Some(Commands::Docker { command }) => docker(&cli.run.workspace, command).await?,
    };

    if code != 0 {
        std::process::exit(code);
    }

    Ok(())
}

async fn run(args: &RunArgs) -> Result<i32> {
    let config = CiConfig::from_env(&args.workspace)?;
    info!("Starting karatOS CI in {}", config.workspace.display());

    let outcome = Pipeline::new(config).run(&args.pipeline_options()).await?;
    Ok(outcome.exit_code())
}

async fn docker(workspace: &Path, command: DockerCommand) -> Result<i32> {
    let workspace = std::fs::canonicalize(workspace)
        .with_context(|| format!("Invalid workspace directory {}", workspace.display()))?;
    let ci = DockerCi::new(workspace);

    if let Err(e) = ci.ensure_available().await {
        return Ok(e.exit_code());
    }

    match ci.dispatch(&command).await {
        Ok(()) => Ok(0),
        Err(e) => {
            error!("{}", e);
            Ok(e.exit_code())
        }
    }
}
