use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::Target;
use crate::error::CiError;

pub const DEFAULT_REPORT_FILE: &str = "ci_report.json";
pub const DEFAULT_BUILD_SCRIPT: &str = "./build.sh";

/// Settings shared by every component of a CI run.
#[derive(Debug, Clone)]
pub struct CiConfig {
    pub workspace: PathBuf,
    /// Argv prefix of the script performing a single build or emulated test.
    /// A relative program path is resolved against the workspace.
    pub build_command: Vec<String>,
    pub build_timeout: Duration,
    pub test_timeout: Duration,
    pub probe_timeout: Duration,
    pub required_tools: Vec<String>,
    /// Probe argv; the tool name is appended as the last argument.
    pub tool_probe: Vec<String>,
    pub target_list_command: Vec<String>,
    pub required_triples: Vec<String>,
    pub report_file: String,
}

impl Default for CiConfig {
    fn default() -> Self {
        let mut required_tools = vec!["rustc".to_string(), "cargo".to_string()];
        required_tools.extend(Target::ALL.iter().map(|t| t.emulator().to_string()));

        Self {
            workspace: PathBuf::from("."),
            build_command: vec![DEFAULT_BUILD_SCRIPT.to_string()],
            build_timeout: Duration::from_secs(120),
            test_timeout: Duration::from_secs(60),
            probe_timeout: Duration::from_secs(10),
            required_tools,
            tool_probe: vec!["which".to_string()],
            target_list_command: vec![
                "rustup".to_string(),
                "target".to_string(),
                "list".to_string(),
                "--installed".to_string(),
            ],
            required_triples: Target::ALL.iter().map(|t| t.triple().to_string()).collect(),
            report_file: DEFAULT_REPORT_FILE.to_string(),
        }
    }
}

impl CiConfig {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            ..Self::default()
        }
    }

    /// Builds a config for `workspace`, resolving it to an absolute path and
    /// applying `KARATOS_*` environment overrides.
    pub fn from_env(workspace: &Path) -> Result<Self, CiError> {
        let workspace = std::fs::canonicalize(workspace).map_err(|source| CiError::InvalidWorkspace {
            path: workspace.to_path_buf(),
            source,
        })?;

        let mut config = Self::new(workspace);

        if let Ok(script) = env::var("KARATOS_BUILD_SCRIPT") {
            config.build_command = vec![script];
        }

        config.build_timeout = env::var("KARATOS_BUILD_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(config.build_timeout);

        config.test_timeout = env::var("KARATOS_TEST_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(config.test_timeout);

        Ok(config)
    }

    /// `build_command` with a relative script path (`./build.sh`) made
    /// absolute; bare program names are left for `PATH` lookup.
    pub fn resolved_build_command(&self) -> Vec<String> {
        let mut command = self.build_command.clone();

        if let Some(program) = command.first_mut() {
            let path = Path::new(program.as_str());
            if path.is_relative() && path.components().count() > 1 {
                *program = self.workspace.join(path).to_string_lossy().into_owned();
            }
        }

        command
    }

    pub fn report_path(&self) -> PathBuf {
        self.workspace.join(&self.report_file)
    }

    /// Where cargo leaves the kernel ELF for `triple` and `profile`.
    pub fn binary_path(&self, triple: &str, profile: &str) -> PathBuf {
        self.workspace
            .join("target")
            .join(triple)
            .join(profile)
            .join("kernel")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_every_target() {
        let config = CiConfig::default();
        assert_eq!(
            config.required_tools,
            vec!["rustc", "cargo", "qemu-system-arm", "qemu-system-riscv32"]
        );
        assert_eq!(
            config.required_triples,
            vec!["thumbv7m-none-eabi", "riscv32imac-unknown-none-elf"]
        );
        assert_eq!(config.build_timeout, Duration::from_secs(120));
        assert_eq!(config.test_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_paths_are_workspace_relative() {
        let config = CiConfig::new("/work");
        assert_eq!(config.resolved_build_command(), vec!["/work/./build.sh"]);
        assert_eq!(config.report_path(), PathBuf::from("/work/ci_report.json"));
        assert_eq!(
            config.binary_path("thumbv7m-none-eabi", "debug"),
            PathBuf::from("/work/target/thumbv7m-none-eabi/debug/kernel")
        );
    }

    #[test]
    fn test_program_names_are_not_resolved() {
        let mut config = CiConfig::new("/work");
        config.build_command = vec!["sh".to_string(), "ci/build.sh".to_string()];
        assert_eq!(config.resolved_build_command(), vec!["sh", "ci/build.sh"]);

        config.build_command = vec!["/opt/ci/build.sh".to_string()];
        assert_eq!(config.resolved_build_command(), vec!["/opt/ci/build.sh"]);
    }
}
