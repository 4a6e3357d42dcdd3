use anyhow::Result;
use karatos_ci::config::CiConfig;
use karatos_ci::core::{BuildType, Target};
use karatos_ci::jobs::RunState;
use karatos_ci::pipeline::{Pipeline, PipelineOptions, PipelineOutcome};
use karatos_ci::report::Report;
use karatos_ci::tasks::KernelTasks;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Stand-in for the kernel's build.sh. Marker files in the workspace make a
/// target fail, hang or skip producing its binary.
const BUILD_SCRIPT: &str = r#"#!/bin/sh
target="$1"
mode="$2"

case "$target" in
  arm) triple="thumbv7m-none-eabi" ;;
  riscv) triple="riscv32imac-unknown-none-elf" ;;
  *) echo "unknown target: $target" >&2; exit 2 ;;
esac

echo "$*" >> invocations.log

if [ "$mode" = "-t" ]; then
  if [ -f "fail_test_$target" ]; then
    echo "qemu: $target kernel panicked" >&2
    exit 1
  fi
  echo "qemu: all $target tests passed"
  exit 0
fi

if [ -f "hang_$target" ]; then
  sleep 5
fi

if [ -f "fail_build_$target" ]; then
  echo "error: could not compile kernel for $target" >&2
  exit 1
fi

if [ ! -f "no_binary_$target" ]; then
  mkdir -p "target/$triple/$mode"
  head -c 4096 /dev/zero > "target/$triple/$mode/kernel"
fi

echo "Finished $mode build for $target"
"#;

fn create_test_workspace(temp_dir: &Path) -> Result<CiConfig> {
    fs::write(temp_dir.join("build.sh"), BUILD_SCRIPT)?;

    let mut config = CiConfig::new(temp_dir);
    config.build_command = vec![
        "sh".to_string(),
        temp_dir.join("build.sh").to_string_lossy().into_owned(),
    ];
    config.required_tools = vec!["sh".to_string()];
    config.tool_probe = vec!["sh".to_string(), "-c".to_string(), "command -v \"$0\"".to_string()];
    config.target_list_command = vec![
        "sh".to_string(),
        "-c".to_string(),
        "echo thumbv7m-none-eabi; echo riscv32imac-unknown-none-elf".to_string(),
    ];

    Ok(config)
}

fn mark(temp_dir: &Path, marker: &str) {
    fs::write(temp_dir.join(marker), "").unwrap();
}

fn read_report(temp_dir: &Path) -> Report {
    let saved = fs::read_to_string(temp_dir.join("ci_report.json")).unwrap();
    serde_json::from_str(&saved).unwrap()
}

#[tokio::test]
async fn test_build_records_binary_size() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = Arc::new(create_test_workspace(temp_dir.path())?);
    let tasks = KernelTasks::new(config, RunState::new());

    let result = tasks.build_target(Target::Arm, BuildType::Debug).await?;

    assert_eq!(result.target, Target::Arm);
    assert!(result.success);
    assert_eq!(result.binary_size, 4096);
    assert_eq!(result.error_message, None);
    assert_eq!(tasks.state().builds(), vec![result]);

    let invocations = fs::read_to_string(temp_dir.path().join("invocations.log"))?;
    assert_eq!(invocations.trim(), "arm debug --verbose");
    Ok(())
}

#[tokio::test]
async fn test_build_timeout_is_a_failed_result() -> Result<()> {
    let temp_dir = TempDir::new()?;
    mark(temp_dir.path(), "hang_riscv");

    let mut config = create_test_workspace(temp_dir.path())?;
    config.build_timeout = Duration::from_millis(500);
    let tasks = KernelTasks::new(Arc::new(config), RunState::new());

    let result = tasks.build_target(Target::Riscv, BuildType::Debug).await?;

    assert!(!result.success);
    assert_eq!(result.binary_size, 0);
    assert_eq!(result.error_message.as_deref(), Some("Timeout after 0.5s"));
    assert!(result.duration < 4.0);
    Ok(())
}

#[tokio::test]
async fn test_missing_binary_after_successful_build() -> Result<()> {
    let temp_dir = TempDir::new()?;
    mark(temp_dir.path(), "no_binary_riscv");

    let config = Arc::new(create_test_workspace(temp_dir.path())?);
    let tasks = KernelTasks::new(config, RunState::new());

    let result = tasks.build_target(Target::Riscv, BuildType::Release).await?;

    assert!(result.success);
    assert_eq!(result.binary_size, 0);
    Ok(())
}

#[tokio::test]
async fn test_failed_build_keeps_error_output() -> Result<()> {
    let temp_dir = TempDir::new()?;
    mark(temp_dir.path(), "fail_build_arm");

    let config = Arc::new(create_test_workspace(temp_dir.path())?);
    let tasks = KernelTasks::new(config, RunState::new());

    let result = tasks.build_target(Target::Arm, BuildType::Debug).await?;

    assert!(!result.success);
    assert_eq!(result.binary_size, 0);
    assert!(result
        .error_message
        .unwrap()
        .contains("could not compile kernel for arm"));
    Ok(())
}

#[tokio::test]
async fn test_passing_test_keeps_output() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = Arc::new(create_test_workspace(temp_dir.path())?);
    let tasks = KernelTasks::new(config, RunState::new());

    let result = tasks.test_target(Target::Riscv).await?;

    assert!(result.success);
    assert_eq!(result.output, "qemu: all riscv tests passed\n");
    assert_eq!(result.error_message, None);
    assert_eq!(tasks.state().tests().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_full_parallel_pipeline_passes() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = create_test_workspace(temp_dir.path())?;

    let options = PipelineOptions {
        targets: Target::ALL.to_vec(),
        build_type: BuildType::Release,
        parallel: true,
        report: true,
    };
    let outcome = Pipeline::new(config).run(&options).await?;

    assert_eq!(outcome, PipelineOutcome::Passed);

    let report = read_report(temp_dir.path());
    assert_eq!(report.summary.total_builds, 2);
    assert_eq!(report.summary.successful_builds, 2);
    assert_eq!(report.summary.total_tests, 2);
    assert_eq!(report.summary.test_success_rate, "100.0%");
    assert_eq!(report.binary_sizes.get("arm_release"), Some(&4096));
    assert_eq!(report.binary_sizes.get("riscv_release"), Some(&4096));
    assert!(report.tests.iter().all(|t| t.output.contains("tests passed")));
    Ok(())
}

#[tokio::test]
async fn test_validation_failure_prevents_builds() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut config = create_test_workspace(temp_dir.path())?;
    config.required_tools.push("qemu-system-arm-karatos-missing".to_string());

    let options = PipelineOptions {
        report: true,
        ..PipelineOptions::default()
    };
    let outcome = Pipeline::new(config).run(&options).await?;

    assert_eq!(outcome, PipelineOutcome::ValidationFailed);
    assert_ne!(outcome.exit_code(), 0);
    assert!(!temp_dir.path().join("invocations.log").exists());
    assert!(!temp_dir.path().join("ci_report.json").exists());
    Ok(())
}

#[tokio::test]
async fn test_one_failed_build_skips_all_tests() -> Result<()> {
    let temp_dir = TempDir::new()?;
    mark(temp_dir.path(), "fail_build_riscv");
    let config = create_test_workspace(temp_dir.path())?;

    let options = PipelineOptions {
        parallel: true,
        report: true,
        ..PipelineOptions::default()
    };
    let outcome = Pipeline::new(config).run(&options).await?;

    assert_eq!(outcome, PipelineOutcome::BuildsFailed);

    let report = read_report(temp_dir.path());
    assert_eq!(report.builds.len(), 2);
    assert_eq!(report.summary.successful_builds, 1);
    assert!(report.tests.is_empty());

    let invocations = fs::read_to_string(temp_dir.path().join("invocations.log"))?;
    assert!(!invocations.contains("-t"));
    Ok(())
}

#[tokio::test]
async fn test_failed_test_fails_pipeline() -> Result<()> {
    let temp_dir = TempDir::new()?;
    mark(temp_dir.path(), "fail_test_arm");
    let config = create_test_workspace(temp_dir.path())?;

    let options = PipelineOptions {
        report: true,
        ..PipelineOptions::default()
    };
    let outcome = Pipeline::new(config).run(&options).await?;

    assert_eq!(outcome, PipelineOutcome::TestsFailed);

    let report = read_report(temp_dir.path());
    assert_eq!(report.summary.successful_tests, 1);
    assert_eq!(report.summary.test_success_rate, "50.0%");

    let arm = report.tests.iter().find(|t| t.target == Target::Arm).unwrap();
    assert!(!arm.success);
    assert!(arm.error.as_deref().unwrap().contains("kernel panicked"));
    Ok(())
}
