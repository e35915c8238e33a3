//! # Action Executor
//!
//! Tool calls written by the model are parsed and run out of process. The
//! loop only knows the JSON contract: one request on stdin, one result on
//! stdout. Anything that goes wrong on the way is a soft failure and turns
//! into an empty [`ExecutionResult`].

use crate::config::{RunSettings, SamplingConfig, ToolMap};
use crate::error::{self, Error, Result};
use crate::wire::{lenient, text_or_none};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// What the executor is asked to do this turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionRequest {
    /// Previous model output to scan for tool calls
    pub raw: String,
    pub tools: ToolMap,
    pub execute: bool,
    pub physical_execution: bool,
    pub sandbox: bool,
    pub run_dir: PathBuf,
    pub width: u32,
    pub height: u32,
    pub marks: bool,
    pub restricted_exec: bool,
    pub marks_classic: bool,
    pub marks_cursor: bool,
}

impl ExecutionRequest {
    pub fn new(raw: &str, settings: &RunSettings, sampling: &SamplingConfig) -> Self {
        Self {
            raw: raw.to_string(),
            tools: settings.tools.clone(),
            execute: settings.execute_actions,
            physical_execution: settings.physical_execution,
            sandbox: settings.sandbox,
            run_dir: settings.run_dir.clone(),
            width: settings.width,
            height: settings.height,
            marks: settings.marks,
            restricted_exec: sampling.restricted_exec,
            marks_classic: sampling.marks_classic,
            marks_cursor: sampling.marks_cursor,
        }
    }
}

/// Outcome of one executor run.
///
/// Every field is optional on the wire and decoded on its own: a `null` or
/// mistyped `executed` still leaves the feedback and screenshot usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionResult {
    /// Base64 PNG, empty when no screenshot was produced
    #[serde(deserialize_with = "lenient")]
    pub screenshot_b64: String,
    /// Human-readable feedback for the model
    #[serde(deserialize_with = "text_or_none")]
    pub feedback: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub executed: Vec<serde_json::Value>,
    #[serde(deserialize_with = "lenient")]
    pub malformed: Vec<serde_json::Value>,
    #[serde(deserialize_with = "lenient")]
    pub ignored: Vec<serde_json::Value>,
    #[serde(deserialize_with = "lenient")]
    pub wants_screenshot: bool,
}

/// Runs a turn's actions.
///
/// Infallible by signature: implementations absorb their own failures so a
/// lost turn of execution never takes the loop down.
#[allow(async_fn_in_trait)]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, request: &ExecutionRequest) -> ExecutionResult;
}

// ============================================================================
// Subprocess executor
// ============================================================================

/// One-shot child process per turn.
#[derive(Debug, Clone)]
pub struct SubprocessExecutor {
    program: OsString,
    args: Vec<OsString>,
    timeout: Option<Duration>,
}

impl SubprocessExecutor {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Kill the child if it runs longer than this. `None` waits forever.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the child and parse its answer, reporting every failure.
    pub async fn try_execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        let payload = serde_json::to_vec(request).map_err(|e| {
            error::serialization_error(e.to_string()).with_operation("executor::encode")
        })?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::executor_failed(format!(
                    "failed to spawn {}: {}",
                    self.program.to_string_lossy(),
                    e
                ))
                .with_operation("executor::spawn")
                .set_source(e)
            })?;

        // Feed stdin concurrently so a chatty child can't deadlock on a full
        // stdout pipe while we are still writing.
        if let Some(mut stdin) = child.stdin.take() {
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(&payload).await {
                    tracing::debug!(error = %e, "executor closed stdin early");
                }
            });
        }

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| {
                    Error::executor_timeout(limit.as_secs_f64()).with_operation("executor::wait")
                })?,
            None => child.wait_with_output().await,
        }
        .map_err(|e| {
            Error::executor_failed(format!("failed to collect executor output: {}", e))
                .with_operation("executor::wait")
                .set_source(e)
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            tracing::debug!(stderr = %stderr.trim_end(), "executor stderr");
        }
        if !output.status.success() {
            tracing::debug!(status = %output.status, "executor exited unsuccessfully");
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            return Err(Error::executor_failed("executor produced no output")
                .with_operation("executor::parse")
                .with_context("status", output.status.to_string()));
        }

        serde_json::from_str(&stdout).map_err(|e| {
            Error::parse_failed(format!("executor output is not a result object: {}", e))
                .with_operation("executor::parse")
                .with_context("status", output.status.to_string())
                .set_source(e)
        })
    }
}

impl ActionExecutor for SubprocessExecutor {
    async fn execute(&self, request: &ExecutionRequest) -> ExecutionResult {
        match self.try_execute(request).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "executor failed, continuing with an empty result");
                ExecutionResult::default()
            }
        }
    }
}
