pub mod cli;
pub mod config;
pub mod core;
pub mod detection;
pub mod docker;
pub mod error;
pub mod execution;
pub mod jobs;
pub mod parallel;
pub mod pipeline;
pub mod report;
pub mod tasks;

use crate::core::{BuildResult, BuildType, Target, TestResult};
use crate::tasks::KernelTasks;
use anyhow::Result;
use async_trait::async_trait;

/// Builds and tests a single target.
///
/// An `Err` means the orchestration itself broke; a failing build or test is
/// an `Ok` result with `success == false`.
#[async_trait]
pub trait TargetRunner: Send + Sync {
    async fn build(&self, target: Target, build_type: BuildType) -> Result<BuildResult>;
    async fn test(&self, target: Target) -> Result<TestResult>;
}

#[async_trait]
impl TargetRunner for KernelTasks {
    async fn build(&self, target: Target, build_type: BuildType) -> Result<BuildResult> {
        self.build_target(target, build_type).await
    }

    async fn test(&self, target: Target) -> Result<TestResult> {
        self.test_target(target).await
    }
}
