//! Child process execution
//!
//! Spawns one external command, drains stdout and stderr as they arrive,
//! enforces a wall clock limit and reports a normalized outcome.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::types::{ExecutionResult, ExecutionStatus, NO_OUTPUT, ResourceLimits};

/// Appended to a stream that hit the output cap
pub const TRUNCATED_MARKER: &str = "\n[output truncated]";

/// How long to keep draining pipes after the child exits. Grandchildren can
/// hold the pipes open long after the process we spawned is gone.
const DRAIN_GRACE: Duration = Duration::from_millis(250);

const READ_CHUNK: usize = 8192;

/// Errors that prevent a process from producing an outcome
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("empty command")]
    EmptyCommand,

    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to wait for '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Builder for one child process invocation
#[derive(Debug, Clone)]
pub struct ProcessCommand {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    env: HashMap<String, String>,
    timeout: Option<Duration>,
    max_output: Option<usize>,
}

impl ProcessCommand {
    /// Create a command for the given program
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: HashMap::new(),
            timeout: None,
            max_output: None,
        }
    }

    /// Create a command from an argument vector (program first)
    pub fn from_argv(argv: Vec<String>) -> Result<Self, ProcessError> {
        let mut argv = argv.into_iter();
        let program = argv.next().ok_or(ProcessError::EmptyCommand)?;
        if program.is_empty() {
            return Err(ProcessError::EmptyCommand);
        }
        Ok(Self::new(program).args(argv))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run the process from this directory
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Set an environment variable on top of the inherited environment
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn envs<'a>(mut self, vars: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Apply the timeout and output cap from resource limits
    pub fn limits(mut self, limits: &ResourceLimits) -> Self {
        self.timeout = limits.timeout_duration();
        self.max_output = limits.max_output_bytes();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Cap the bytes kept per output stream
    pub fn max_output(mut self, bytes: usize) -> Self {
        self.max_output = Some(bytes);
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// Raw outcome of a finished (or killed) process
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Exit code if the program exited normally
    pub exit_code: Option<i32>,

    /// Signal number if the program was killed by a signal
    pub signal: Option<i32>,

    pub stdout: String,

    pub stderr: String,

    /// The runner killed the process after the timeout
    pub timed_out: bool,

    /// The timeout that applied to this process
    pub timeout: Option<Duration>,

    pub wall_time: Duration,
}

impl ProcessOutput {
    /// Exit code 0, nothing on stderr, not killed
    #[must_use]
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0) && self.stderr.is_empty()
    }

    /// stderr if non-empty, else stdout, else a placeholder
    pub fn output(&self) -> &str {
        if !self.stderr.is_empty() {
            &self.stderr
        } else if !self.stdout.is_empty() {
            &self.stdout
        } else {
            NO_OUTPUT
        }
    }

    /// Human-readable timeout notice
    pub fn timeout_message(&self, what: &str) -> String {
        match self.timeout {
            Some(limit) => format!("{what} timed out after {}s", limit.as_secs_f64()),
            None => format!("{what} timed out"),
        }
    }
}

impl From<ProcessOutput> for ExecutionResult {
    fn from(out: ProcessOutput) -> Self {
        let wall_time = out.wall_time.as_secs_f64();
        if out.timed_out {
            // Keep whatever the program printed before it hung
            let notice = out.timeout_message("Execution");
            let output = if out.stderr.is_empty() && out.stdout.is_empty() {
                notice
            } else {
                format!("{}\n{notice}", out.output().trim_end_matches('\n'))
            };
            return ExecutionResult {
                status: ExecutionStatus::TimeLimitExceeded,
                output,
                exit_code: None,
                signal: out.signal,
                wall_time,
            };
        }

        let status = if out.success() {
            ExecutionStatus::Ok
        } else if out.exit_code.is_none() && out.signal.is_some() {
            ExecutionStatus::Signaled
        } else {
            ExecutionStatus::RuntimeError
        };

        ExecutionResult {
            status,
            output: out.output().to_owned(),
            exit_code: out.exit_code,
            signal: out.signal,
            wall_time,
        }
    }
}

/// Bounded accumulator for one output stream
#[derive(Debug)]
struct Capture {
    bytes: Vec<u8>,
    limit: usize,
    truncated: bool,
}

impl Capture {
    fn new(limit: Option<usize>) -> Self {
        Self {
            bytes: Vec::new(),
            limit: limit.unwrap_or(usize::MAX),
            truncated: false,
        }
    }

    fn push(&mut self, chunk: &[u8]) {
        if self.truncated {
            return;
        }
        let room = self.limit.saturating_sub(self.bytes.len());
        self.bytes.extend_from_slice(&chunk[..chunk.len().min(room)]);
        if chunk.len() > room {
            self.truncated = true;
            trim_partial_char(&mut self.bytes);
        }
    }

    fn into_string(self) -> String {
        let mut text = String::from_utf8_lossy(&self.bytes).into_owned();
        if self.truncated {
            text.push_str(TRUNCATED_MARKER);
        }
        text
    }
}

/// Drop a UTF-8 sequence cut short at the end of `bytes`
fn trim_partial_char(bytes: &mut Vec<u8>) {
    let tail = bytes.len().saturating_sub(4);
    let Some(lead) = (tail..bytes.len()).rev().find(|&i| bytes[i] & 0xC0 != 0x80) else {
        return;
    };
    if let Err(e) = std::str::from_utf8(&bytes[lead..])
        && e.error_len().is_none()
    {
        bytes.truncate(lead + e.valid_up_to());
    }
}

/// Read the next chunk, or wait forever once the stream is gone
async fn read_chunk<R: AsyncRead + Unpin>(
    stream: &mut Option<R>,
    buf: &mut [u8],
) -> std::io::Result<usize> {
    match stream {
        Some(stream) => stream.read(buf).await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Run a command to completion and capture its output.
///
/// Spawn failures are returned as errors without waiting. On timeout the
/// child is killed with SIGKILL and the outcome is marked `timed_out`.
#[instrument(skip(command), fields(program = %command.program))]
pub async fn run_process(command: &ProcessCommand) -> Result<ProcessOutput, ProcessError> {
    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .envs(&command.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(ref dir) = command.working_dir {
        cmd.current_dir(dir);
    }

    debug!(args = ?command.args, timeout = ?command.timeout, "spawning process");

    let started = Instant::now();
    let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
        program: command.program.clone(),
        source,
    })?;

    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();
    let mut stdout_capture = Capture::new(command.max_output);
    let mut stderr_capture = Capture::new(command.max_output);
    let mut stdout_buf = vec![0u8; READ_CHUNK];
    let mut stderr_buf = vec![0u8; READ_CHUNK];

    let deadline = command.timeout.map(|timeout| started + timeout);
    let mut status: Option<ExitStatus> = None;
    let mut exited_at: Option<Instant> = None;
    let mut timed_out = false;

    loop {
        if status.is_some() && stdout.is_none() && stderr.is_none() {
            break;
        }

        tokio::select! {
            read = read_chunk(&mut stdout, &mut stdout_buf), if stdout.is_some() => {
                match read {
                    Ok(0) | Err(_) => stdout = None,
                    Ok(n) => stdout_capture.push(&stdout_buf[..n]),
                }
            }
            read = read_chunk(&mut stderr, &mut stderr_buf), if stderr.is_some() => {
                match read {
                    Ok(0) | Err(_) => stderr = None,
                    Ok(n) => stderr_capture.push(&stderr_buf[..n]),
                }
            }
            waited = child.wait(), if status.is_none() => {
                let exit = waited.map_err(|source| ProcessError::Wait {
                    program: command.program.clone(),
                    source,
                })?;
                status = Some(exit);
                exited_at = Some(Instant::now());
            }
            _ = sleep_until(deadline), if status.is_none() && !timed_out => {
                debug!("timeout reached, killing process");
                timed_out = true;
                if let Err(e) = child.start_kill() {
                    warn!(error = %e, "failed to kill timed out process");
                }
            }
            _ = sleep_until(exited_at.map(|at| at + DRAIN_GRACE)), if exited_at.is_some() => {
                debug!("output pipes still open after exit, abandoning them");
                break;
            }
        }
    }

    let wall_time = started.elapsed();
    let (exit_code, signal) = status.map(exit_parts).unwrap_or((None, None));

    debug!(
        ?exit_code,
        ?signal,
        timed_out,
        wall_time = wall_time.as_secs_f64(),
        "process finished"
    );

    Ok(ProcessOutput {
        exit_code,
        signal,
        stdout: stdout_capture.into_string(),
        stderr: stderr_capture.into_string(),
        timed_out,
        timeout: command.timeout,
        wall_time,
    })
}

#[cfg(unix)]
fn exit_parts(status: ExitStatus) -> (Option<i32>, Option<i32>) {
    use std::os::unix::process::ExitStatusExt;
    (status.code(), status.signal())
}

#[cfg(not(unix))]
fn exit_parts(status: ExitStatus) -> (Option<i32>, Option<i32>) {
    (status.code(), None)
}
