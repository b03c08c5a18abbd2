//! External-process capability
//!
//! Every cluster and cold-storage operation is one invocation of an external tool. The
//! pipeline only talks to [`StageRunner`], so its ordering and failure policy can be exercised
//! without `rbd` or the object-store CLI installed.

use async_trait::async_trait;
use rookvault_core::AppError;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;

/// Kind of pipeline stage. Decides which tool runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Export,
    Import,
    Upload,
    Download,
    Delete,
    ListObjects,
    ListImages,
    ImageInfo,
    Bootstrap,
}

impl StageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Export => "export",
            StageKind::Import => "import",
            StageKind::Upload => "upload",
            StageKind::Download => "download",
            StageKind::Delete => "delete",
            StageKind::ListObjects => "list_objects",
            StageKind::ListImages => "list_images",
            StageKind::ImageInfo => "image_info",
            StageKind::Bootstrap => "bootstrap",
        }
    }
}

impl Display for StageKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Result of one external invocation: exit code and combined output (stdout, then stderr).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutput {
    /// `None` when the process was terminated by a signal or could not be spawned.
    pub exit_code: Option<i32>,
    pub output: String,
}

impl StageOutput {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            exit_code: Some(0),
            output: output.into(),
        }
    }

    pub fn failure(exit_code: Option<i32>, output: impl Into<String>) -> Self {
        Self {
            exit_code,
            output: output.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs one pipeline stage to completion.
///
/// Implementations report a non-zero exit through [`StageOutput`] rather than an error; `Err`
/// is reserved for failures of the runner itself.
#[async_trait]
pub trait StageRunner: Send + Sync {
    async fn run(&self, kind: StageKind, args: &[String]) -> Result<StageOutput, AppError>;
}

/// Tools used by [`ProcessRunner`].
#[derive(Debug, Clone)]
pub struct ProcessRunnerConfig {
    pub rbd_path: String,
    pub object_store_cli: String,
    pub toolbox_path: Option<String>,
}

/// [`StageRunner`] backed by real processes.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    config: ProcessRunnerConfig,
}

impl ProcessRunner {
    pub fn new(config: ProcessRunnerConfig) -> Self {
        Self { config }
    }

    fn program(&self, kind: StageKind) -> Result<&str, AppError> {
        match kind {
            StageKind::Export | StageKind::Import | StageKind::ListImages | StageKind::ImageInfo => {
                Ok(&self.config.rbd_path)
            }
            StageKind::Upload | StageKind::Download | StageKind::Delete | StageKind::ListObjects => {
                Ok(&self.config.object_store_cli)
            }
            StageKind::Bootstrap => self
                .config
                .toolbox_path
                .as_deref()
                .ok_or_else(|| AppError::Internal("TOOLBOX_PATH not configured".to_string())),
        }
    }
}

#[async_trait]
impl StageRunner for ProcessRunner {
    async fn run(&self, kind: StageKind, args: &[String]) -> Result<StageOutput, AppError> {
        let program = self.program(kind)?;
        let start = Instant::now();

        tracing::debug!(stage = %kind, program, args = ?args, "Running stage");

        let result = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(stage = %kind, program, error = %e, "Failed to spawn stage process");
                return Ok(StageOutput::failure(
                    None,
                    format!("failed to run {}: {}", program, e),
                ));
            }
        };

        let combined = combine_output(&output.stdout, &output.stderr);
        let exit_code = output.status.code();

        tracing::debug!(
            stage = %kind,
            exit_code = ?exit_code,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Stage process exited"
        );

        Ok(StageOutput {
            exit_code,
            output: combined,
        })
    }
}

fn combine_output(stdout: &[u8], stderr: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);
    let (stdout, stderr) = (stdout.trim_end(), stderr.trim_end());

    match (stdout.is_empty(), stderr.is_empty()) {
        (true, _) => stderr.to_string(),
        (false, true) => stdout.to_string(),
        (false, false) => format!("{}\n{}", stdout, stderr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner(rbd: &str, cli: &str) -> ProcessRunner {
        ProcessRunner::new(ProcessRunnerConfig {
            rbd_path: rbd.to_string(),
            object_store_cli: cli.to_string(),
            toolbox_path: None,
        })
    }

    #[test]
    fn combined_output_keeps_both_streams() {
        assert_eq!(combine_output(b"out\n", b"err\n"), "out\nerr");
        assert_eq!(combine_output(b"", b"err"), "err");
        assert_eq!(combine_output(b"out", b""), "out");
        assert_eq!(combine_output(b"", b""), "");
    }

    #[test]
    fn stage_kinds_map_to_tools() {
        let runner = runner("/usr/bin/rbd", "/usr/bin/aws");
        assert_eq!(runner.program(StageKind::Export).unwrap(), "/usr/bin/rbd");
        assert_eq!(runner.program(StageKind::ImageInfo).unwrap(), "/usr/bin/rbd");
        assert_eq!(runner.program(StageKind::Upload).unwrap(), "/usr/bin/aws");
        assert_eq!(runner.program(StageKind::Delete).unwrap(), "/usr/bin/aws");
        assert!(runner.program(StageKind::Bootstrap).is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captures_output_of_failing_process() {
        // `sh -c <script>` stands in for both tools.
        let runner = runner("sh", "sh");
        let args = vec!["-c".to_string(), "echo exporting; echo boom >&2; exit 3".to_string()];

        let output = runner.run(StageKind::Export, &args).await.unwrap();
        assert!(!output.is_success());
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.output, "exporting\nboom");
    }

    #[tokio::test]
    async fn missing_binary_is_a_stage_failure() {
        let runner = runner("/nonexistent/rbd", "/nonexistent/aws");
        let output = runner.run(StageKind::Upload, &[]).await.unwrap();
        assert!(!output.is_success());
        assert_eq!(output.exit_code, None);
        assert!(output.output.contains("/nonexistent/aws"));
    }
}
