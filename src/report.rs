use crate::core::{BuildResult, BuildType, OrchestrationFailure, Phase, Target, TestResult};
use crate::error::CiError;
use crate::jobs::RunState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_builds: usize,
    pub successful_builds: usize,
    pub build_success_rate: String,
    pub total_tests: usize,
    pub successful_tests: usize,
    pub test_success_rate: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub target: Target,
    pub build_type: BuildType,
    pub success: bool,
    pub duration: String,
    pub binary_size: u64,
    pub error: Option<String>,
}

impl From<&BuildResult> for BuildRecord {
    fn from(build: &BuildResult) -> Self {
        Self {
            target: build.target,
            build_type: build.build_type,
            success: build.success,
            duration: format_duration(build.duration),
            binary_size: build.binary_size,
            error: build.error_message.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRecord {
    pub target: Target,
    pub success: bool,
    pub duration: String,
    pub output: String,
    pub error: Option<String>,
}

impl From<&TestResult> for TestRecord {
    fn from(test: &TestResult) -> Self {
        Self {
            target: test.target,
            success: test.success,
            duration: format_duration(test.duration),
            output: test.output.clone(),
            error: test.error_message.clone(),
        }
    }
}

/// Snapshot of a run, serialized to `ci_report.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub summary: Summary,
    pub binary_sizes: BTreeMap<String, u64>,
    pub builds: Vec<BuildRecord>,
    pub tests: Vec<TestRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub orchestration_errors: Vec<OrchestrationFailure>,
}

/// Percentage of successful items; 0 when there are none.
pub fn success_rate(successful: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        successful as f64 / total as f64 * 100.0
    }
}

fn format_rate(rate: f64) -> String {
    format!("{:.1}%", rate)
}

fn format_duration(seconds: f64) -> String {
    format!("{:.2}s", seconds)
}

/// Formats `bytes` with comma thousands separators.
pub fn format_bytes(bytes: u64) -> String {
    let digits = bytes.to_string();
    let mut formatted = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            formatted.push(',');
        }
        formatted.push(digit);
    }

    formatted
}

impl Report {
    pub fn generate(state: &RunState) -> Self {
        let builds = state.builds();
        let tests = state.tests();
        let orchestration_errors = state.orchestration_errors();

        // A target whose task broke left no result behind; it still counts as a failure.
        let broken = |phase: Phase| orchestration_errors.iter().filter(|f| f.phase == phase).count();

        let total_builds = builds.len() + broken(Phase::Build);
        let successful_builds = builds.iter().filter(|b| b.success).count();
        let total_tests = tests.len() + broken(Phase::Test);
        let successful_tests = tests.iter().filter(|t| t.success).count();

        // Later successful builds of the same target/profile overwrite earlier ones.
        let mut binary_sizes = BTreeMap::new();
        for build in builds.iter().filter(|b| b.success) {
            binary_sizes.insert(build.size_key(), build.binary_size);
        }

        Self {
            summary: Summary {
                total_builds,
                successful_builds,
                build_success_rate: format_rate(success_rate(successful_builds, total_builds)),
                total_tests,
                successful_tests,
                test_success_rate: format_rate(success_rate(successful_tests, total_tests)),
            },
            binary_sizes,
            builds: builds.iter().map(BuildRecord::from).collect(),
            tests: tests.iter().map(TestRecord::from).collect(),
            orchestration_errors,
        }
    }

    pub fn to_json(&self) -> Result<String, CiError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Overwrites `path` with the pretty-printed report.
    pub async fn save(&self, path: &Path) -> Result<(), CiError> {
        let json = self.to_json()?;

        fs::write(path, json).await.map_err(|source| CiError::ReportWrite {
            path: path.to_path_buf(),
            source,
        })?;

        info!("Report saved to {}", path.display());
        Ok(())
    }

    pub fn render_summary(&self) -> String {
        let rule = "=".repeat(60);
        let mut lines = vec![
            String::new(),
            rule.clone(),
            "CI/CD SUMMARY".to_string(),
            rule,
            format!(
                "Builds: {}/{} ({})",
                self.summary.successful_builds, self.summary.total_builds, self.summary.build_success_rate
            ),
            format!(
                "Tests:  {}/{} ({})",
                self.summary.successful_tests, self.summary.total_tests, self.summary.test_success_rate
            ),
            String::new(),
            "Binary Sizes:".to_string(),
        ];

        for (name, size) in &self.binary_sizes {
            lines.push(format!(
                "  {}: {} bytes ({:.1} KB)",
                name,
                format_bytes(*size),
                *size as f64 / 1024.0
            ));
        }

        if !self.orchestration_errors.is_empty() {
            lines.push(String::new());
            lines.push("Orchestration Errors:".to_string());
            for failure in &self.orchestration_errors {
                lines.push(format!("  {} {}: {}", failure.target, failure.phase, failure.message));
            }
        }

        lines.join("\n")
    }

    pub fn print_summary(&self) {
        println!("{}", self.render_summary());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0");
        assert_eq!(format_bytes(999), "999");
        assert_eq!(format_bytes(4096), "4,096");
        assert_eq!(format_bytes(1234567), "1,234,567");
    }

    #[test]
    fn test_success_rate_without_items() {
        assert_eq!(success_rate(0, 0), 0.0);
        assert_eq!(format_rate(success_rate(1, 3)), "33.3%");
    }
}
