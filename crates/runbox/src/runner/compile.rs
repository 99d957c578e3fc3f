//! Compilation step for compiled languages
//!
//! Runs the language's compiler over the workspace source and reports
//! whether an artifact is ready to run.

use tracing::{debug, instrument};

use crate::config::{Config, Language};
use crate::process::{ProcessCommand, ProcessOutput, run_process};
use crate::runner::CompileError;
use crate::workspace::Workspace;

/// Result of a compilation
#[derive(Debug, Clone)]
pub struct CompileResult {
    /// Whether the compiler exited with code 0 before the timeout
    pub success: bool,

    /// Compiler diagnostics: stderr, or stdout when stderr is empty
    pub error_output: String,

    /// Raw outcome of the compiler process
    pub process: ProcessOutput,
}

impl CompileResult {
    /// Check if compilation was successful
    pub fn is_success(&self) -> bool {
        self.success
    }
}

/// Compile the workspace source
#[instrument(skip_all, fields(language = %language.name, stem = %workspace.stem()))]
pub async fn compile(
    workspace: &Workspace,
    config: &Config,
    language: &Language,
) -> Result<CompileResult, CompileError> {
    let compile_config = language
        .compile
        .as_ref()
        .ok_or_else(|| CompileError::NotCompiled(language.name.clone()))?;

    let limits = config.effective_limits(compile_config.limits.as_ref());
    let argv = Language::expand_command(&compile_config.command, &workspace.placeholders());
    let command = ProcessCommand::from_argv(argv)?
        .working_dir(workspace.dir())
        .envs(&compile_config.env)
        .limits(&limits);

    let process = run_process(&command).await?;
    let success = !process.timed_out && process.exit_code == Some(0);

    let error_output = if process.timed_out {
        process.timeout_message("compilation")
    } else if !process.stderr.is_empty() {
        process.stderr.clone()
    } else {
        process.stdout.clone()
    };

    debug!(
        success,
        exit_code = ?process.exit_code,
        timed_out = process.timed_out,
        "compilation complete"
    );

    Ok(CompileResult {
        success,
        error_output,
        process,
    })
}
