//! Code runner for runbox
//!
//! Provides the high-level API that takes an [`ExecutionRequest`] through
//! language dispatch, workspace setup, compilation, execution and cleanup.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument};

pub use crate::runner::compile::{CompileResult, compile};
pub use crate::runner::execute::execute;

mod compile;
mod execute;

use crate::{
    config::{Config, Language},
    process::ProcessError,
    types::{ExecutionRequest, ExecutionResult},
    workspace::{Workspace, WorkspaceError, WorkspaceRoot},
};

/// Errors that occur during compilation
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("language '{0}' does not support compilation")]
    NotCompiled(String),

    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// Errors that occur during execution
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("execution not started: {0}")]
    NotStarted(String),

    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// Errors the runner cannot turn into an [`ExecutionResult`]
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error("execution queue is closed")]
    QueueClosed,
}

/// High-level runner for code execution
#[derive(Debug, Clone)]
pub struct Runner {
    config: Arc<Config>,
    workspace: WorkspaceRoot,
    slots: Arc<Semaphore>,
}

impl Runner {
    /// Create a runner and make sure its temp directory exists
    pub async fn new(config: Config) -> Result<Self, RunnerError> {
        let workspace = WorkspaceRoot::new(&config.temp_dir, config.isolation);
        workspace.ensure().await?;
        let slots = Arc::new(Semaphore::new(config.max_concurrent));
        Ok(Self {
            config: Arc::new(config),
            workspace,
            slots,
        })
    }

    /// Create a runner with the embedded default configuration
    pub async fn with_defaults() -> Result<Self, RunnerError> {
        Self::new(Config::default()).await
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn workspace(&self) -> &WorkspaceRoot {
        &self.workspace
    }

    /// Number of executions that could start right now
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    /// Execute a request from start to finish.
    ///
    /// Every expected failure (unknown language, file error, compile error,
    /// spawn error, runtime error, timeout) is reported as an unsuccessful
    /// [`ExecutionResult`]. Only problems with the runner itself are errors.
    #[instrument(skip(self, request), fields(language = %request.language))]
    pub async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult, RunnerError> {
        let Some((id, language)) = self.config.resolve(&request.language) else {
            debug!("unsupported language");
            return Ok(ExecutionResult::unsupported(&request.language));
        };
        if let Some(ref message) = language.unavailable {
            debug!(id, "language unavailable");
            return Ok(ExecutionResult::unavailable(message));
        }

        let _slot = self
            .slots
            .acquire()
            .await
            .map_err(|_| RunnerError::QueueClosed)?;

        let workspace = match self.workspace.open(language, &request.code).await {
            Ok(workspace) => workspace,
            Err(e) => return Ok(ExecutionResult::file_error(&e.to_string())),
        };

        let result = self.run_in(&workspace, language).await;
        workspace.release().await;

        info!(
            id,
            status = ?result.status,
            exit_code = ?result.exit_code,
            wall_time = result.wall_time,
            "execution finished"
        );

        Ok(result)
    }

    /// Compile (if needed) and run inside a prepared workspace
    async fn run_in(&self, workspace: &Workspace, language: &Language) -> ExecutionResult {
        if language.is_compiled() {
            match compile::compile(workspace, &self.config, language).await {
                Ok(compiled) if compiled.is_success() => {}
                Ok(compiled) => return ExecutionResult::compile_failed(&compiled.error_output),
                Err(e) => return ExecutionResult::compile_failed(&e.to_string()),
            }
        }

        match execute::execute(workspace, &self.config, language).await {
            Ok(result) => result,
            Err(e) => ExecutionResult::spawn_failed(&e.to_string()),
        }
    }
}
