use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::config::language::{
    CompileConfig, DEFAULT_CLASS_NAME, FileExtension, Language, Placeholders, RunConfig,
    SourceNaming, public_class_name,
};
use crate::types::ResourceLimits;

pub mod language;
mod loader;

/// Example configuration embedded at compile time.
///
/// Library users can access this to generate a starter config file.
pub const EXAMPLE_CONFIG: &str = include_str!("../../runbox.example.toml");

/// Prefix for environment variable overrides (`RUNBOX__SERVER__BIND`)
pub const ENV_PREFIX: &str = "RUNBOX";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid characters in file extension")]
    InvalidFileExtChars,

    #[error("failed to parse config: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// How request workspaces are laid out under the temp directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Isolation {
    /// Every request writes directly into the shared temp directory
    Shared,

    /// Every request gets its own subdirectory, removed on release
    #[default]
    PerRequest,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Bearer token required on execution routes; open when unset
    #[serde(default)]
    pub auth_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            auth_token: None,
        }
    }
}

/// Config for runbox
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Scratch directory shared by all requests
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Workspace layout under `temp_dir`
    #[serde(default)]
    pub isolation: Isolation,

    /// Maximum number of executions running at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Default resource limits applied to every compile and run step.
    /// Per-language limits override these field by field.
    #[serde(default)]
    pub default_limits: ResourceLimits,

    #[serde(default)]
    pub server: ServerConfig,

    /// Language configurations keyed by language ID
    #[serde(default)]
    pub languages: HashMap<String, Language>,
}

impl Config {
    /// Create a new config with embedded default languages
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty config with no languages
    pub fn empty() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            isolation: Isolation::default(),
            max_concurrent: default_max_concurrent(),
            default_limits: ResourceLimits::default(),
            server: ServerConfig::default(),
            languages: HashMap::new(),
        }
    }

    /// Find the language a request tag refers to.
    ///
    /// Matches language IDs and aliases case-insensitively.
    pub fn resolve(&self, tag: &str) -> Option<(&str, &Language)> {
        let tag = tag.to_lowercase();
        self.languages.iter().find_map(|(id, lang)| {
            let matches = id.to_lowercase() == tag
                || lang.aliases.iter().any(|alias| alias.to_lowercase() == tag);
            matches.then_some((id.as_str(), lang))
        })
    }

    /// Merge built-in limits, config defaults and a language override
    pub fn effective_limits(&self, overrides: Option<&ResourceLimits>) -> ResourceLimits {
        let base = ResourceLimits::default().with_overrides(&self.default_limits);
        match overrides {
            Some(limits) => base.with_overrides(limits),
            None => base,
        }
    }

    /// Validate the configuration
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent must be at least 1".to_owned(),
            ));
        }
        if let Some(timeout) = self.default_limits.timeout
            && !(timeout.is_finite() && timeout > 0.0)
        {
            return Err(ConfigError::Invalid(format!(
                "default timeout must be positive, got {timeout}"
            )));
        }

        let mut tags = HashSet::new();
        for (id, lang) in &self.languages {
            if lang.name.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty name"
                )));
            }
            if lang.extension.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty extension"
                )));
            }
            if lang.is_available() && lang.run.command.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty run command"
                )));
            }
            if let Some(ref compile) = lang.compile {
                if compile.command.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "language '{id}' has empty compile command"
                    )));
                }
                if compile.artifact.is_empty() || compile.artifact.contains('/') {
                    return Err(ConfigError::Invalid(format!(
                        "language '{id}' has invalid compile artifact '{}'",
                        compile.artifact
                    )));
                }
            }
            for tag in std::iter::once(id).chain(lang.aliases.iter()) {
                if !tags.insert(tag.to_lowercase()) {
                    return Err(ConfigError::Invalid(format!(
                        "language tag '{tag}' is used more than once"
                    )));
                }
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::parse_toml(EXAMPLE_CONFIG).expect("embedded default config should be valid")
    }
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join("runbox")
}

fn default_max_concurrent() -> usize {
    8
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_owned()
}
