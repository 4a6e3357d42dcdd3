use crate::config::CiConfig;
use crate::core::{BuildResult, BuildType, Phase, Target, TaskOutcome, TestResult};
use crate::detection::EnvironmentValidator;
use crate::error::CiError;
use crate::execution::CommandExecutor;
use crate::jobs::RunState;
use crate::parallel::{run_parallel, run_sequential};
use crate::report::Report;
use crate::tasks::KernelTasks;
use crate::TargetRunner;
use std::sync::Arc;
use tracing::{error, info, info_span, Instrument};

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub targets: Vec<Target>,
    pub build_type: BuildType,
    pub parallel: bool,
    pub report: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            targets: Target::ALL.to_vec(),
            build_type: BuildType::Debug,
            parallel: false,
            report: false,
        }
    }
}

/// How a run ended, in the order the gates are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    ValidationFailed,
    BuildsFailed,
    TestsFailed,
    Passed,
}

impl PipelineOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineOutcome::Passed => 0,
            _ => 1,
        }
    }
}

pub struct Pipeline<R> {
    config: Arc<CiConfig>,
    executor: CommandExecutor,
    runner: Arc<R>,
    state: RunState,
}

impl Pipeline<KernelTasks> {
    pub fn new(config: CiConfig) -> Self {
        let config = Arc::new(config);
        let state = RunState::new();
        let runner = KernelTasks::new(config.clone(), state.clone());
        Self::with_runner(config, runner, state)
    }
}

impl<R: TargetRunner + 'static> Pipeline<R> {
    /// `state` should be the same run state `runner` records into.
    pub fn with_runner(config: Arc<CiConfig>, runner: R, state: RunState) -> Self {
        Self {
            executor: CommandExecutor::new(&config.workspace),
            config,
            runner: Arc::new(runner),
            state,
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub async fn run(&self, options: &PipelineOptions) -> Result<PipelineOutcome, CiError> {
        let span = info_span!("ci_run", run_id = %self.state.id());
        self.run_phases(options).instrument(span).await
    }

    async fn run_phases(&self, options: &PipelineOptions) -> Result<PipelineOutcome, CiError> {
        let validator = EnvironmentValidator::new(&self.executor, &self.config);
        if !validator.validate().await {
            error!("Environment validation failed");
            return Ok(PipelineOutcome::ValidationFailed);
        }

        let builds = self.run_builds(options).await;
        if !builds.iter().all(|outcome| outcome.succeeded()) {
            error!("Some builds failed, skipping tests");
            if options.report {
                self.save_report().await?;
            }
            return Ok(PipelineOutcome::BuildsFailed);
        }

        let tests = self.run_tests(options).await;

        if options.report {
            self.save_report().await?.print_summary();
        }

        if !tests.iter().all(|outcome| outcome.succeeded()) {
            error!("Some tests failed");
            return Ok(PipelineOutcome::TestsFailed);
        }

        info!("🎉 All builds and tests passed!");
        Ok(PipelineOutcome::Passed)
    }

    pub async fn run_builds(&self, options: &PipelineOptions) -> Vec<TaskOutcome<BuildResult>> {
        let build_type = options.build_type;
        let runner = self.runner.clone();
        let make_task = move |target: Target| {
            let runner = runner.clone();
            async move {
                let result = runner.build(target, build_type).await?;
                log_build(&result);
                Ok::<_, anyhow::Error>(result)
            }
        };

        let outcomes = if options.parallel {
            info!("Starting parallel builds for {:?} ({})", options.targets, build_type);
            run_parallel(&options.targets, make_task).await
        } else {
            run_sequential(&options.targets, make_task).await
        };

        self.record_orchestration_errors(Phase::Build, &outcomes);
        outcomes
    }

    pub async fn run_tests(&self, options: &PipelineOptions) -> Vec<TaskOutcome<TestResult>> {
        let runner = self.runner.clone();
        let make_task = move |target: Target| {
            let runner = runner.clone();
            async move {
                let result = runner.test(target).await?;
                log_test(&result);
                Ok::<_, anyhow::Error>(result)
            }
        };

        let outcomes = if options.parallel {
            info!("Starting parallel tests for {:?}", options.targets);
            run_parallel(&options.targets, make_task).await
        } else {
            run_sequential(&options.targets, make_task).await
        };

        self.record_orchestration_errors(Phase::Test, &outcomes);
        outcomes
    }

    fn record_orchestration_errors<T>(&self, phase: Phase, outcomes: &[TaskOutcome<T>]) {
        for outcome in outcomes {
            if let TaskOutcome::OrchestrationError { target, message } = outcome {
                self.state.record_orchestration_error(*target, phase, message.clone());
            }
        }
    }

    pub async fn save_report(&self) -> Result<Report, CiError> {
        let report = Report::generate(&self.state);
        report.save(&self.config.report_path()).await?;
        Ok(report)
    }
}

fn log_build(result: &BuildResult) {
    if result.success {
        info!("✅ {} build succeeded ({} bytes)", result.target, result.binary_size);
    } else {
        error!(
            "❌ {} build failed: {}",
            result.target,
            result.error_message.as_deref().unwrap_or_default()
        );
    }
}

fn log_test(result: &TestResult) {
    if result.success {
        info!("✅ {} tests passed ({:.2}s)", result.target, result.duration);
    } else {
        error!(
            "❌ {} tests failed: {}",
            result.target,
            result.error_message.as_deref().unwrap_or_default()
        );
    }
}
