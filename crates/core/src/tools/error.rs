//! Error types for external tool invocations.

use std::path::PathBuf;
use thiserror::Error;

use super::types::ToolKind;

/// Errors that can occur while running an external tool.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Tool binary not found.
    #[error("{tool} not found at path: {path}")]
    NotFound { tool: ToolKind, path: PathBuf },

    /// Input file handed to the tool does not exist.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// Tool exited unsuccessfully.
    #[error("{tool} failed with exit code {code:?}")]
    Failed {
        tool: ToolKind,
        code: Option<i32>,
        stderr: Option<String>,
    },

    /// Tool did not finish in time.
    #[error("{tool} timed out after {timeout_secs} seconds")]
    Timeout { tool: ToolKind, timeout_secs: u64 },

    /// I/O error while spawning or talking to the tool.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    /// Creates a failure error, dropping empty stderr.
    pub fn failed(tool: ToolKind, code: Option<i32>, stderr: impl Into<String>) -> Self {
        let stderr = stderr.into();
        Self::Failed {
            tool,
            code,
            stderr: if stderr.trim().is_empty() {
                None
            } else {
                Some(stderr)
            },
        }
    }
}
