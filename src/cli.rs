use crate::core::{BuildType, Target};
use crate::docker::DockerCommand;
use crate::pipeline::PipelineOptions;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Without a subcommand the full validate, build and test pipeline runs.
#[derive(Debug, Parser)]
#[command(name = "karatos-ci", version, about = "karatOS CI/CD Test Runner")]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Docker-based builds, tests and releases
    Docker {
        #[command(subcommand)]
        command: DockerCommand,
    },
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Targets to build and test
    #[arg(long, num_args = 1.., value_enum, default_values_t = [Target::Arm, Target::Riscv])]
    pub targets: Vec<Target>,

    /// Build type
    #[arg(long, value_enum, default_value_t = BuildType::Debug)]
    pub build_type: BuildType,

    /// Run builds and tests in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Generate JSON report
    #[arg(long)]
    pub report: bool,

    /// Workspace directory
    #[arg(long, global = true, default_value = ".")]
    pub workspace: PathBuf,
}

impl RunArgs {
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            targets: self.targets.clone(),
            build_type: self.build_type,
            parallel: self.parallel,
            report: self.report,
        }
    }
}
