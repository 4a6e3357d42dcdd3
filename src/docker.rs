//! docker-compose front end for containerized karatOS builds.
//!
//! Every subcommand maps to one or more `docker-compose` invocations run in
//! the workspace with the caller's terminal attached. Services are defined by
//! the workspace `docker-compose.yml`.

use crate::error::CiError;
use crate::execution::CommandExecutor;
use clap::Subcommand;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use tracing::{error, info};

pub const DEFAULT_SHELL_SERVICE: &str = "karatos-ci";
pub const RELEASE_VOLUME: &str = "rtos-rust_release-artifacts";

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum DockerCommand {
    /// Build Docker images
    Build {
        /// Specific service to build
        #[arg(long)]
        service: Option<String>,
    },
    /// Run tests
    Test,
    /// Run complete CI/CD pipeline
    Pipeline,
    /// Create release artifacts
    Release,
    /// Start interactive shell
    Shell {
        /// Service to run shell in
        #[arg(long, default_value = DEFAULT_SHELL_SERVICE)]
        service: String,
    },
    /// Show service status
    Status,
    /// Show service logs
    Logs {
        /// Specific service logs
        #[arg(long)]
        service: Option<String>,
    },
    /// Clean up Docker resources
    Cleanup,
    /// Quick ARM development build
    DevArm,
    /// Quick RISC-V development build
    DevRiscv,
    /// Quick development test
    DevTest,
}

pub struct DockerCi {
    executor: CommandExecutor,
    workspace: PathBuf,
    compose_program: Vec<String>,
    docker_program: Vec<String>,
}

impl DockerCi {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self::with_programs(workspace, vec!["docker-compose".to_string()], vec!["docker".to_string()])
    }

    /// Uses `compose` and `docker` as the argv prefixes for compose and plain
    /// docker invocations.
    pub fn with_programs(workspace: impl Into<PathBuf>, compose: Vec<String>, docker: Vec<String>) -> Self {
        let workspace = workspace.into();
        Self {
            executor: CommandExecutor::new(&workspace),
            workspace,
            compose_program: compose,
            docker_program: docker,
        }
    }

    pub async fn ensure_available(&self) -> Result<(), CiError> {
        let mut probe = self.compose_program.clone();
        probe.push("--version".to_string());

        let outcome = self.executor.execute(&probe, Duration::from_secs(10)).await;
        if !outcome.success {
            error!("docker-compose not found. Please install Docker Compose.");
            return Err(CiError::ToolMissing {
                tool: "docker-compose".to_string(),
            });
        }

        Ok(())
    }

    pub async fn dispatch(&self, command: &DockerCommand) -> Result<(), CiError> {
        match command {
            DockerCommand::Build { service } => self.build_images(service.as_deref()).await,
            DockerCommand::Test => self.run_tests().await,
            DockerCommand::Pipeline => self.run_ci_pipeline().await,
            DockerCommand::Release => self.create_release().await,
            DockerCommand::Shell { service } => self.interactive_shell(service).await,
            DockerCommand::Status => self.show_status().await,
            DockerCommand::Logs { service } => self.show_logs(service.as_deref()).await,
            DockerCommand::Cleanup => self.cleanup().await,
            DockerCommand::DevArm => self.compose(&["run", "--rm", "karatos-arm"]).await,
            DockerCommand::DevRiscv => self.compose(&["run", "--rm", "karatos-riscv"]).await,
            DockerCommand::DevTest => self.compose(&["run", "--rm", "karatos-test"]).await,
        }
    }

    pub async fn build_images(&self, service: Option<&str>) -> Result<(), CiError> {
        info!("Building Docker images...");

        let mut args = vec!["build"];
        args.extend(service);
        self.compose(&args).await?;

        info!("✅ Docker images built successfully");
        Ok(())
    }

    pub async fn run_parallel_builds(&self) -> Result<(), CiError> {
        info!("Starting parallel builds...");

        self.compose(&["up", "-d", "karatos-arm", "karatos-riscv"]).await?;

        self.compose(&["logs", "-f", "karatos-arm"]).await?;
        self.compose(&["logs", "-f", "karatos-riscv"]).await?;

        self.compose_unchecked(&["ps", "-q", "karatos-arm"]).await?;
        self.compose_unchecked(&["ps", "-q", "karatos-riscv"]).await?;

        info!("✅ Parallel builds completed");
        Ok(())
    }

    pub async fn run_tests(&self) -> Result<(), CiError> {
        info!("Running comprehensive tests...");

        self.compose(&["run", "--rm", "karatos-test"]).await?;

        info!("✅ Tests completed");
        Ok(())
    }

    pub async fn run_ci_pipeline(&self) -> Result<(), CiError> {
        info!("🚀 Starting complete CI/CD pipeline");

        let result = async {
            self.build_images(None).await?;
            self.run_parallel_builds().await?;
            self.run_tests().await
        }
        .await;

        match result {
            Ok(()) => {
                info!("✅ CI/CD pipeline completed successfully");
                Ok(())
            }
            Err(e) => {
                error!("❌ CI/CD pipeline failed: {}", e);
                Err(e)
            }
        }
    }

    pub async fn create_release(&self) -> Result<(), CiError> {
        info!("Creating release artifacts...");

        self.build_images(Some("karatos-release")).await?;
        self.compose(&["run", "--rm", "karatos-release"]).await?;

        let artifacts = format!("{}:/artifacts", RELEASE_VOLUME);
        let output = format!("{}:/output", self.workspace.join("release").display());
        self.docker(&[
            "run",
            "--rm",
            "-v",
            artifacts.as_str(),
            "-v",
            output.as_str(),
            "alpine:latest",
            "sh",
            "-c",
            "cp -r /artifacts/* /output/",
        ])
        .await?;

        info!("✅ Release artifacts created in ./release/");
        Ok(())
    }

    pub async fn interactive_shell(&self, service: &str) -> Result<(), CiError> {
        info!("Starting interactive shell in {}...", service);
        self.compose(&["run", "--rm", service]).await
    }

    pub async fn cleanup(&self) -> Result<(), CiError> {
        info!("Cleaning up Docker resources...");

        self.compose(&["down", "-v"]).await?;

        info!("✅ Cleanup completed");
        Ok(())
    }

    pub async fn show_status(&self) -> Result<(), CiError> {
        info!("Docker Compose service status:");
        self.compose(&["ps"]).await
    }

    pub async fn show_logs(&self, service: Option<&str>) -> Result<(), CiError> {
        let mut args = vec!["logs"];
        args.extend(service);
        self.compose(&args).await
    }

    async fn compose(&self, args: &[&str]) -> Result<(), CiError> {
        self.run(&self.compose_program, args, true).await.map(|_| ())
    }

    async fn compose_unchecked(&self, args: &[&str]) -> Result<ExitStatus, CiError> {
        self.run(&self.compose_program, args, false).await
    }

    async fn docker(&self, args: &[&str]) -> Result<(), CiError> {
        self.run(&self.docker_program, args, true).await.map(|_| ())
    }

    async fn run(&self, program: &[String], args: &[&str], check: bool) -> Result<ExitStatus, CiError> {
        let mut command = program.to_vec();
        command.extend(args.iter().map(|arg| arg.to_string()));

        let status = self.executor.run_inherited(&command).await?;

        if check && !status.success() {
            let code = status.code().unwrap_or(1);
            error!("Command failed with exit code {}", code);
            return Err(CiError::CommandFailed {
                command: command.join(" "),
                code,
            });
        }

        Ok(status)
    }
}
