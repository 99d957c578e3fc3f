//! A library for running short programs on behalf of an interview platform.
//!
//! Runbox takes a source string and a language tag, writes the source into a
//! scratch workspace, compiles it when the language needs it, runs it under a
//! wall clock limit and reports a single normalized result.
//!
//! # Features
//!
//! - **Multi-language**: interpreted and compiled languages, configured in TOML.
//! - **Workspace isolation**: per-request directories so concurrent Java
//!   submissions with the same class name do not collide.
//! - **Time and output limits**: runaway programs are killed, floods are capped.
//! - **Guaranteed cleanup**: every file a request creates is removed afterwards.

pub use config::{Config, ConfigError, EXAMPLE_CONFIG, Isolation, Language};
pub use process::{ProcessCommand, ProcessError, ProcessOutput, run_process};
pub use runner::{CompileError, CompileResult, ExecuteError, Runner, RunnerError};
pub use types::{
    ExecutionRequest, ExecutionResult, ExecutionStatus, RequestError, ResourceLimits,
};
pub use workspace::{Workspace, WorkspaceError, WorkspaceRoot};

pub mod config;
pub mod process;
pub mod runner;
pub mod types;
pub mod workspace;
