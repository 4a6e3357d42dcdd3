use crate::config::CiConfig;
use crate::error::CiError;
use crate::execution::CommandExecutor;
use tracing::{error, info};

/// Preflight check that every tool and toolchain target a run needs is
/// installed.
pub struct EnvironmentValidator<'a> {
    executor: &'a CommandExecutor,
    config: &'a CiConfig,
}

impl<'a> EnvironmentValidator<'a> {
    pub fn new(executor: &'a CommandExecutor, config: &'a CiConfig) -> Self {
        Self { executor, config }
    }

    pub async fn validate(&self) -> bool {
        info!("Validating CI environment");

        match self.check().await {
            Ok(()) => {
                info!("✅ Environment validation passed");
                true
            }
            Err(e) => {
                error!("{}", e);
                false
            }
        }
    }

    /// Stops at the first missing tool or target.
    pub async fn check(&self) -> Result<(), CiError> {
        for tool in &self.config.required_tools {
            self.probe_tool(tool).await?;
        }

        self.check_toolchain_targets().await
    }

    async fn probe_tool(&self, tool: &str) -> Result<(), CiError> {
        let mut probe = self.config.tool_probe.clone();
        probe.push(tool.to_string());

        let outcome = self.executor.execute(&probe, self.config.probe_timeout).await;
        if !outcome.success {
            return Err(CiError::ToolMissing {
                tool: tool.to_string(),
            });
        }

        Ok(())
    }

    async fn check_toolchain_targets(&self) -> Result<(), CiError> {
        let outcome = self
            .executor
            .execute(&self.config.target_list_command, self.config.probe_timeout)
            .await;

        if !outcome.success {
            return Err(CiError::TargetListUnavailable(outcome.output));
        }

        if let Some(missing) = missing_triples(&outcome.output, &self.config.required_triples).first() {
            return Err(CiError::TargetMissing {
                triple: missing.to_string(),
            });
        }

        Ok(())
    }
}

/// Required triples that do not appear anywhere in `installed`.
pub fn missing_triples<'r>(installed: &str, required: &'r [String]) -> Vec<&'r str> {
    required
        .iter()
        .filter(|triple| !installed.contains(triple.as_str()))
        .map(String::as_str)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_triples() {
        let required = vec![
            "thumbv7m-none-eabi".to_string(),
            "riscv32imac-unknown-none-elf".to_string(),
        ];
        let installed = "thumbv7m-none-eabi\nx86_64-unknown-linux-gnu\n";

        assert_eq!(missing_triples(installed, &required), vec!["riscv32imac-unknown-none-elf"]);
        assert!(missing_triples("thumbv7m-none-eabi riscv32imac-unknown-none-elf", &required).is_empty());
    }
}
