use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::execution::CommandOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Arm,
    Riscv,
}

impl Target {
    pub const ALL: [Target; 2] = [Target::Arm, Target::Riscv];

    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Arm => "arm",
            Target::Riscv => "riscv",
        }
    }

    /// Rust toolchain triple the kernel is cross-compiled for.
    pub fn triple(&self) -> &'static str {
        match self {
            Target::Arm => "thumbv7m-none-eabi",
            Target::Riscv => "riscv32imac-unknown-none-elf",
        }
    }

    /// QEMU system emulator used to run the target's test suite.
    pub fn emulator(&self) -> &'static str {
        match self {
            Target::Arm => "qemu-system-arm",
            Target::Riscv => "qemu-system-riscv32",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BuildType {
    #[default]
    Debug,
    Release,
}

impl BuildType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildType::Debug => "debug",
            BuildType::Release => "release",
        }
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildResult {
    pub target: Target,
    pub build_type: BuildType,
    pub success: bool,
    /// Wall-clock seconds spent in the build command.
    pub duration: f64,
    pub binary_size: u64,
    pub error_message: Option<String>,
}

impl BuildResult {
    pub fn succeeded(target: Target, build_type: BuildType, duration: f64, binary_size: u64) -> Self {
        Self {
            target,
            build_type,
            success: true,
            duration,
            binary_size,
            error_message: None,
        }
    }

    pub fn failed(target: Target, build_type: BuildType, duration: f64, error: String) -> Self {
        Self {
            target,
            build_type,
            success: false,
            duration,
            binary_size: 0,
            error_message: Some(error),
        }
    }

    /// Key used in the report's binary size table, e.g. `arm_debug`.
    pub fn size_key(&self) -> String {
        format!("{}_{}", self.target, self.build_type)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub target: Target,
    pub success: bool,
    pub duration: f64,
    pub output: String,
    pub error_message: Option<String>,
}

impl TestResult {
    /// Captured output is kept even for passing runs.
    pub fn from_command(target: Target, outcome: CommandOutcome) -> Self {
        let error_message = if outcome.success {
            None
        } else {
            Some(outcome.output.clone())
        };

        Self {
            target,
            success: outcome.success,
            duration: outcome.duration,
            output: outcome.output,
            error_message,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Build,
    Test,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Build => f.write_str("build"),
            Phase::Test => f.write_str("test"),
        }
    }
}

/// A failure inside the orchestration itself rather than in the external
/// command (a task returning an error or a worker panicking).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationFailure {
    pub target: Target,
    pub phase: Phase,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome<T> {
    Completed(T),
    OrchestrationError { target: Target, message: String },
}

impl<T> TaskOutcome<T> {
    pub fn completed(&self) -> Option<&T> {
        match self {
            TaskOutcome::Completed(result) => Some(result),
            TaskOutcome::OrchestrationError { .. } => None,
        }
    }

    pub fn is_orchestration_error(&self) -> bool {
        matches!(self, TaskOutcome::OrchestrationError { .. })
    }
}

/// Common view of a per-target result.
pub trait TargetResult {
    fn target(&self) -> Target;
    fn success(&self) -> bool;
}

impl TargetResult for BuildResult {
    fn target(&self) -> Target {
        self.target
    }

    fn success(&self) -> bool {
        self.success
    }
}

impl TargetResult for TestResult {
    fn target(&self) -> Target {
        self.target
    }

    fn success(&self) -> bool {
        self.success
    }
}

impl<T: TargetResult> TaskOutcome<T> {
    pub fn target(&self) -> Target {
        match self {
            TaskOutcome::Completed(result) => result.target(),
            TaskOutcome::OrchestrationError { target, .. } => *target,
        }
    }

    /// Orchestration errors never count as success.
    pub fn succeeded(&self) -> bool {
        self.completed().map_or(false, TargetResult::success)
    }
}
