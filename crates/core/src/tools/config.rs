//! Configuration for the tools module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the WCSTools runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to the imstar binary.
    #[serde(default = "default_imstar_path")]
    pub imstar_path: PathBuf,

    /// Path to the imwcs binary.
    #[serde(default = "default_imwcs_path")]
    pub imwcs_path: PathBuf,

    /// Timeout for a single invocation in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Pass the verbose flag to both tools.
    #[serde(default = "default_true")]
    pub verbose: bool,

    /// Number of trailing stdout lines kept in each run record.
    #[serde(default = "default_output_tail")]
    pub output_tail_lines: usize,
}

fn default_imstar_path() -> PathBuf {
    PathBuf::from("imstar")
}

fn default_imwcs_path() -> PathBuf {
    PathBuf::from("imwcs")
}

fn default_timeout() -> u64 {
    600
}

fn default_true() -> bool {
    true
}

fn default_output_tail() -> usize {
    20
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            imstar_path: default_imstar_path(),
            imwcs_path: default_imwcs_path(),
            timeout_secs: default_timeout(),
            verbose: true,
            output_tail_lines: default_output_tail(),
        }
    }
}

impl ToolsConfig {
    /// Creates a new config with custom binary paths.
    pub fn with_paths(imstar_path: PathBuf, imwcs_path: PathBuf) -> Self {
        Self {
            imstar_path,
            imwcs_path,
            ..Default::default()
        }
    }

    /// Sets the timeout in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Enables or disables verbose tool output.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}
