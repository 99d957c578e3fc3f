//! Execution step for code running
//!
//! Runs the interpreter over the source, or the compiled artifact, and
//! normalizes the outcome.

use tracing::{debug, instrument};

use crate::config::{Config, Language};
use crate::process::{ProcessCommand, run_process};
use crate::runner::ExecuteError;
use crate::types::ExecutionResult;
use crate::workspace::Workspace;

/// Run the program held by a prepared workspace
#[instrument(skip_all, fields(language = %language.name, stem = %workspace.stem()))]
pub async fn execute(
    workspace: &Workspace,
    config: &Config,
    language: &Language,
) -> Result<ExecutionResult, ExecuteError> {
    // Compiled languages run the artifact, which must exist by now
    if let Some(artifact) = workspace.artifact()
        && !tokio::fs::try_exists(artifact).await.unwrap_or(false)
    {
        return Err(ExecuteError::NotStarted(format!(
            "artifact '{}' not found - was compilation run?",
            artifact.display()
        )));
    }

    let limits = config.effective_limits(language.run.limits.as_ref());
    let argv = Language::expand_command(&language.run.command, &workspace.placeholders());

    debug!(?argv, "executing program");

    let command = ProcessCommand::from_argv(argv)?
        .working_dir(workspace.dir())
        .envs(&language.run.env)
        .limits(&limits);

    let result = ExecutionResult::from(run_process(&command).await?);

    debug!(
        status = ?result.status,
        exit_code = ?result.exit_code,
        wall_time = result.wall_time,
        "execution complete"
    );

    Ok(result)
}
