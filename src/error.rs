use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CiError {
    #[error("Required tool not found: {tool}")]
    ToolMissing { tool: String },

    #[error("Failed to check Rust targets: {0}")]
    TargetListUnavailable(String),

    #[error("Required Rust target not installed: {triple}")]
    TargetMissing { triple: String },

    #[error("Failed to write report to {path}: {source}")]
    ReportWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command `{command}` failed with exit code {code}")]
    CommandFailed { command: String, code: i32 },

    #[error("Invalid workspace directory {path}: {source}")]
    InvalidWorkspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CiError {
    /// Process exit code the binary should terminate with for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CiError::CommandFailed { code, .. } => *code,
            _ => 1,
        }
    }
}
