use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Placeholder output when a process wrote nothing to either stream
pub const NO_OUTPUT: &str = "No output";

/// Message returned to callers that omit `code` or `language`
pub const MISSING_PARAMETER: &str = "Missing code or language parameter";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Wall clock limit in seconds for a single process (compile or run)
    #[serde(default)]
    pub timeout: Option<f64>,

    /// Maximum captured size per output stream in kilobytes
    #[serde(default)]
    pub max_output: Option<u64>,
}

impl ResourceLimits {
    /// 1 kilobyte in bytes
    pub const KB: u64 = 1024;

    /// Create new resource limits with the built-in defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits with every field unset, used as an override layer
    pub fn unset() -> Self {
        Self {
            timeout: None,
            max_output: None,
        }
    }

    /// Set the wall clock limit in seconds
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout = Some(seconds);
        self
    }

    /// Set the per-stream output cap in kilobytes
    pub fn with_max_output(mut self, kb: u64) -> Self {
        self.max_output = Some(kb);
        self
    }

    /// Merge limits, with `overrides` taking precedence for fields that are set
    pub fn with_overrides(&self, overrides: &ResourceLimits) -> Self {
        Self {
            timeout: overrides.timeout.or(self.timeout),
            max_output: overrides.max_output.or(self.max_output),
        }
    }

    /// Timeout as a duration, if one is set
    pub fn timeout_duration(&self) -> Option<Duration> {
        self.timeout
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(Duration::from_secs_f64)
    }

    /// Output cap in bytes, if one is set
    pub fn max_output_bytes(&self) -> Option<usize> {
        self.max_output
            .map(|kb| usize::try_from(kb.saturating_mul(Self::KB)).unwrap_or(usize::MAX))
    }
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            timeout: Some(10.0),
            max_output: Some(1024), // 1 MB
        }
    }
}

/// A request to run one snippet of source code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub code: String,
    pub language: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("Missing code or language parameter")]
    MissingParameter,
}

impl ExecutionRequest {
    /// Build a request, rejecting empty code or an empty language tag
    pub fn new(
        code: impl Into<String>,
        language: impl Into<String>,
    ) -> Result<Self, RequestError> {
        let code = code.into();
        let language = language.into();
        if code.is_empty() || language.is_empty() {
            return Err(RequestError::MissingParameter);
        }
        Ok(Self { code, language })
    }
}

/// Normalized outcome of one execution request
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// What happened, for logging and callers that need more than a flag
    pub status: ExecutionStatus,

    /// stderr if non-empty, else stdout, else [`NO_OUTPUT`]; or a failure message
    pub output: String,

    /// Exit code of the final process, `-1` for failures before a process ran
    pub exit_code: Option<i32>,

    /// Signal number if the program was killed by a signal
    pub signal: Option<i32>,

    /// Wall clock time of the run phase in seconds
    pub wall_time: f64,
}

impl ExecutionResult {
    /// Check if the execution was successful (exit code 0 with empty stderr)
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.status, ExecutionStatus::Ok)
    }

    fn failure(status: ExecutionStatus, output: String, exit_code: Option<i32>) -> Self {
        Self {
            status,
            output,
            exit_code,
            signal: None,
            wall_time: 0.0,
        }
    }

    pub fn compile_failed(message: &str) -> Self {
        Self::failure(
            ExecutionStatus::CompileError,
            format!("Compilation error: {message}"),
            Some(-1),
        )
    }

    pub fn spawn_failed(message: &str) -> Self {
        Self::failure(
            ExecutionStatus::SpawnError,
            format!("Execution error: {message}"),
            Some(-1),
        )
    }

    pub fn file_error(message: &str) -> Self {
        Self::failure(
            ExecutionStatus::FileError,
            format!("File operation error: {message}"),
            Some(-1),
        )
    }

    /// The language tag did not match any configured language
    pub fn unsupported(language: &str) -> Self {
        Self::failure(
            ExecutionStatus::Unsupported,
            format!("Language '{language}' is not supported"),
            None,
        )
    }

    /// The language is known but switched off with a fixed message
    pub fn unavailable(message: &str) -> Self {
        Self::failure(ExecutionStatus::Unavailable, message.to_owned(), None)
    }
}

/// Status of an execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Exit code 0 and nothing on stderr
    Ok,

    /// Non-zero exit code, or output on stderr
    RuntimeError,

    /// Killed by a signal the runner did not send
    Signaled,

    /// Killed by the runner after the wall clock limit
    TimeLimitExceeded,

    /// The compile step failed; nothing was run
    CompileError,

    /// The program could not be started
    SpawnError,

    /// The source could not be written to the workspace
    FileError,

    /// Unknown language tag
    Unsupported,

    /// Known language that is switched off
    Unavailable,
}
