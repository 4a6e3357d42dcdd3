use crate::config::CiConfig;
use crate::core::{BuildResult, BuildType, Target, TestResult};
use crate::execution::CommandExecutor;
use crate::jobs::RunState;
use anyhow::{Context, Result};
use std::io::ErrorKind;
use std::sync::Arc;
use tokio::fs;
use tracing::{info, warn};

/// Builds and emulator-tests the kernel through the workspace build script,
/// recording every result in the shared [`RunState`].
pub struct KernelTasks {
    executor: CommandExecutor,
    config: Arc<CiConfig>,
    state: RunState,
}

impl KernelTasks {
    pub fn new(config: Arc<CiConfig>, state: RunState) -> Self {
        Self {
            executor: CommandExecutor::new(&config.workspace),
            config,
            state,
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn build_command(&self, target: Target, build_type: BuildType) -> Vec<String> {
        let mut command = self.config.resolved_build_command();
        command.extend([target.to_string(), build_type.to_string(), "--verbose".to_string()]);
        command
    }

    pub fn test_command(&self, target: Target) -> Vec<String> {
        let mut command = self.config.resolved_build_command();
        command.extend([target.to_string(), "-t".to_string()]);
        command
    }

    pub async fn build_target(&self, target: Target, build_type: BuildType) -> Result<BuildResult> {
        info!("Building {} ({})", target, build_type);

        let command = self.build_command(target, build_type);
        let outcome = self.executor.execute(&command, self.config.build_timeout).await;

        let result = if outcome.success {
            let binary_size = self.binary_size(target, build_type).await?;
            BuildResult::succeeded(target, build_type, outcome.duration, binary_size)
        } else {
            BuildResult::failed(target, build_type, outcome.duration, outcome.output)
        };

        self.state.record_build(result.clone());
        Ok(result)
    }

    pub async fn test_target(&self, target: Target) -> Result<TestResult> {
        info!("Testing {} with QEMU", target);

        let command = self.test_command(target);
        let outcome = self.executor.execute(&command, self.config.test_timeout).await;

        let result = TestResult::from_command(target, outcome);
        self.state.record_test(result.clone());
        Ok(result)
    }

    /// A missing binary after a successful build is logged and reported as
    /// size 0; any other metadata error is a task error.
    async fn binary_size(&self, target: Target, build_type: BuildType) -> Result<u64> {
        let binary_path = self.config.binary_path(target.triple(), build_type.as_str());

        match fs::metadata(&binary_path).await {
            Ok(metadata) => Ok(metadata.len()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Binary not found: {}", binary_path.display());
                Ok(0)
            }
            Err(e) => Err(e).with_context(|| format!("Failed to stat binary {}", binary_path.display())),
        }
    }
}
