//! WCSTools-backed implementation (`imstar` + `imwcs`).

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use super::config::ToolsConfig;
use super::error::ToolError;
use super::traits::AstrometryTools;
use super::types::{DetectionJob, RefineJob, ToolKind, ToolRun};

/// Seconds allowed for the availability probe in `validate`.
const VALIDATE_TIMEOUT_SECS: u64 = 10;

/// Runs the WCSTools command-line programs.
pub struct WcsTools {
    config: ToolsConfig,
}

impl WcsTools {
    /// Creates a runner with the given configuration.
    pub fn new(config: ToolsConfig) -> Self {
        Self { config }
    }

    /// Creates a runner that resolves both tools from `PATH`.
    pub fn with_defaults() -> Self {
        Self::new(ToolsConfig::default())
    }

    /// `imstar -vhi <threshold> -tw <image>`
    fn build_detection_args(&self, job: &DetectionJob) -> Vec<String> {
        let flags = if self.config.verbose { "-vhi" } else { "-hi" };
        vec![
            flags.to_string(),
            job.threshold.to_string(),
            // Tab table output, written next to the image
            "-tw".to_string(),
            job.image.to_string_lossy().to_string(),
        ]
    }

    /// `imwcs -wv -i <iterations> -c <star table> <image>`
    fn build_refine_args(&self, job: &RefineJob) -> Vec<String> {
        let flags = if self.config.verbose { "-wv" } else { "-w" };
        vec![
            flags.to_string(),
            "-i".to_string(),
            job.iterations.to_string(),
            "-c".to_string(),
            job.star_table.to_string_lossy().to_string(),
            job.image.to_string_lossy().to_string(),
        ]
    }

    fn program(&self, tool: ToolKind) -> &Path {
        match tool {
            ToolKind::StarDetector => self.config.imstar_path.as_path(),
            ToolKind::WcsFitter => self.config.imwcs_path.as_path(),
        }
    }

    fn spawn_error(&self, tool: ToolKind, e: std::io::Error) -> ToolError {
        if e.kind() == std::io::ErrorKind::NotFound {
            ToolError::NotFound {
                tool,
                path: self.program(tool).to_path_buf(),
            }
        } else {
            ToolError::Io(e)
        }
    }

    /// Runs one tool to completion inside `working_dir`.
    async fn run(
        &self,
        tool: ToolKind,
        args: Vec<String>,
        working_dir: &Path,
    ) -> Result<ToolRun, ToolError> {
        if !working_dir.is_dir() {
            return Err(ToolError::InputNotFound {
                path: working_dir.to_path_buf(),
            });
        }

        let program = self.program(tool);
        let start = Instant::now();
        debug!(tool = %tool, program = %program.display(), ?args, "Spawning tool");

        let child = Command::new(program)
            .args(&args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(tool, e))?;

        // Dropping the child on timeout kills it.
        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let output = match timeout(timeout_duration, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ToolError::Timeout {
                    tool,
                    timeout_secs: self.config.timeout_secs,
                })
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stdout.lines() {
            debug!(tool = %tool, "{}", line);
        }

        if !output.status.success() {
            warn!(
                tool = %tool,
                code = ?output.status.code(),
                "Tool exited unsuccessfully"
            );
            return Err(ToolError::failed(tool, output.status.code(), stderr));
        }
        if !stderr.trim().is_empty() {
            debug!(tool = %tool, stderr = %stderr.trim(), "Tool wrote to stderr");
        }

        let lines: Vec<&str> = stdout.lines().collect();
        let skip = lines.len().saturating_sub(self.config.output_tail_lines);
        let output_tail = lines[skip..].iter().map(|l| l.to_string()).collect();

        Ok(ToolRun {
            tool,
            program: program.to_path_buf(),
            args,
            exit_code: output.status.code(),
            duration_ms: start.elapsed().as_millis() as u64,
            output_tail,
        })
    }

    /// Checks that a tool can be spawned. Exit status is ignored because
    /// both programs exit non-zero when printing their usage.
    async fn probe(&self, tool: ToolKind) -> Result<(), ToolError> {
        let status = Command::new(self.program(tool))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        match timeout(Duration::from_secs(VALIDATE_TIMEOUT_SECS), status).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(self.spawn_error(tool, e)),
            Err(_) => Err(ToolError::Timeout {
                tool,
                timeout_secs: VALIDATE_TIMEOUT_SECS,
            }),
        }
    }
}

#[async_trait]
impl AstrometryTools for WcsTools {
    fn name(&self) -> &str {
        "wcstools"
    }

    async fn detect_stars(&self, job: &DetectionJob) -> Result<ToolRun, ToolError> {
        if !job.image.exists() {
            return Err(ToolError::InputNotFound {
                path: job.image.clone(),
            });
        }
        let args = self.build_detection_args(job);
        self.run(ToolKind::StarDetector, args, &job.working_dir)
            .await
    }

    async fn refine_wcs(&self, job: &RefineJob) -> Result<ToolRun, ToolError> {
        for path in [&job.image, &job.star_table] {
            if !path.exists() {
                return Err(ToolError::InputNotFound { path: path.clone() });
            }
        }
        let args = self.build_refine_args(job);
        self.run(ToolKind::WcsFitter, args, &job.working_dir).await
    }

    async fn validate(&self) -> Result<(), ToolError> {
        self.probe(ToolKind::StarDetector).await?;
        self.probe(ToolKind::WcsFitter).await?;
        Ok(())
    }
}
