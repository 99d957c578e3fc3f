//! Runbox server and CLI
//!
//! Serves the `/execute` endpoint and offers a few local commands for
//! trying languages and configuration without going through HTTP.

mod auth;
mod handlers;
mod routes;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use runbox::{Config, EXAMPLE_CONFIG, ExecutionRequest, Runner};
use tokio::net::TcpListener;
use tracing::{Level, debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Shared state handed to every request
#[derive(Debug, Clone)]
pub struct AppState {
    pub runner: Runner,
    pub auth_token: Option<Arc<str>>,
}

#[derive(Parser)]
#[command(name = "runbox")]
#[command(about = "Code execution service for interview practice")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default)
    Serve {
        /// Address to listen on (overrides server.bind)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Initialize a new configuration file
    Init {
        /// Output path (default: runbox.toml)
        #[arg(short, long, default_value = "runbox.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Run a source file once and print its output
    Run {
        /// Source file to run
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Language tag (e.g., python, java, c++)
        #[arg(short, long)]
        language: String,
    },

    /// List available languages
    Languages,

    /// Show effective configuration
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if let Some(Commands::Init { ref output, force }) = cli.command {
        return init_config(output, force).await;
    }

    match cli.config {
        Some(ref path) => info!(?path, "loading configuration"),
        None => debug!("using default configuration"),
    }
    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command.unwrap_or(Commands::Serve { bind: None }) {
        Commands::Serve { bind } => serve(config, bind).await,
        Commands::Init { .. } => Ok(()),
        Commands::Run { source, language } => run_once(config, &source, &language).await,
        Commands::Languages => {
            list_languages(&config);
            Ok(())
        }
        Commands::ShowConfig => {
            show_config(&config);
            Ok(())
        }
    }
}

async fn serve(config: Config, bind: Option<String>) -> Result<()> {
    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    let auth_token = config.server.auth_token.as_deref().map(Arc::from);
    if auth_token.is_none() {
        warn!("no auth token configured, anyone who can reach {bind} can run code");
    }

    let runner = Runner::new(config)
        .await
        .context("failed to prepare temp directory")?;
    info!(
        temp_dir = %runner.workspace().path().display(),
        isolation = ?runner.workspace().isolation(),
        max_concurrent = runner.available_slots(),
        "runner ready"
    );

    let app = routes::router(AppState { runner, auth_token });

    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind to {bind}"))?;
    info!("HTTP server listening on {bind}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested, finishing in-flight requests");
}

async fn run_once(config: Config, source: &Path, language: &str) -> Result<()> {
    let code = tokio::fs::read_to_string(source)
        .await
        .context("failed to read source file")?;
    let request = ExecutionRequest::new(code, language)?;

    let runner = Runner::new(config)
        .await
        .context("failed to prepare temp directory")?;

    info!(language, "running program");
    let result = runner.execute(&request).await.context("execution failed")?;

    println!("{}", result.output);

    // Log execution info via tracing (stderr), keeping stdout clean for piping
    info!(
        status = ?result.status,
        wall_time = format_args!("{:.3}s", result.wall_time),
        exit_code = result.exit_code,
        signal = result.signal,
        "execution result"
    );

    if result.is_success() {
        Ok(())
    } else {
        std::process::exit(result.exit_code.filter(|&code| code > 0).unwrap_or(1));
    }
}

fn list_languages(config: &Config) {
    println!("Available languages:\n");

    let mut languages: Vec<_> = config.languages.iter().collect();
    languages.sort_by_key(|(id, _)| *id);

    for (id, lang) in languages {
        let lang_type = if !lang.is_available() {
            "unavailable"
        } else if lang.is_compiled() {
            "compiled"
        } else {
            "interpreted"
        };
        if lang.aliases.is_empty() {
            println!("  {:<15} {} ({})", id, lang.name, lang_type);
        } else {
            println!(
                "  {:<15} {} ({}, aliases: {})",
                id,
                lang.name,
                lang_type,
                lang.aliases.join(", ")
            );
        }
    }
}

fn show_config(config: &Config) {
    println!("Default resource limits:");
    println!("  Timeout: {:?} s", config.default_limits.timeout);
    println!("  Max output: {:?} KB", config.default_limits.max_output);
    println!();
    println!("Temp directory: {}", config.temp_dir.display());
    println!("Isolation: {:?}", config.isolation);
    println!("Max concurrent executions: {}", config.max_concurrent);
    println!();
    println!("Bind address: {}", config.server.bind);
    println!(
        "Auth token: {}",
        if config.server.auth_token.is_some() {
            "set"
        } else {
            "not set"
        }
    );
    println!();
    println!("Languages configured: {}", config.languages.len());
}

async fn init_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at '{}'. Use --force to overwrite.",
            output.display()
        );
    }

    tokio::fs::write(output, EXAMPLE_CONFIG)
        .await
        .context("failed to write configuration file")?;

    println!("Created configuration file at '{}'", output.display());
    Ok(())
}
