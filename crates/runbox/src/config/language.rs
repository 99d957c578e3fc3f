use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, de};

use crate::config::ConfigError;
use crate::types::ResourceLimits;

const INVALID_FILE_EXT_CHARS: [char; 2] = ['/', '.'];

/// Class name used when Java source declares no public class
pub const DEFAULT_CLASS_NAME: &str = "Main";

static PUBLIC_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"public\s+class\s+(\w+)").expect("public class pattern should compile")
});

/// Configuration for a programming language
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Language {
    /// Human-readable name for the language (e.g., "C++ (GCC)")
    pub name: String,

    /// File extension of the source file
    pub extension: FileExtension,

    /// Extra tags that select this language (matched case-insensitively)
    #[serde(default)]
    pub aliases: Vec<String>,

    /// How the source file stem is chosen
    #[serde(default)]
    pub naming: SourceNaming,

    /// Compilation configuration (None for interpreted languages)
    #[serde(default)]
    pub compile: Option<CompileConfig>,

    /// Execution configuration
    #[serde(default)]
    pub run: RunConfig,

    /// When set, the language is recognized but every request gets this message
    #[serde(default)]
    pub unavailable: Option<String>,
}

impl Language {
    /// Check if the language is compiled
    pub fn is_compiled(&self) -> bool {
        self.compile.is_some()
    }

    /// Check if requests for this language are actually executed
    pub fn is_available(&self) -> bool {
        self.unavailable.is_none()
    }

    /// File stem dictated by the submission itself, if the language needs one.
    ///
    /// `None` means any fresh name will do.
    pub fn source_stem(&self, code: &str) -> Option<String> {
        match self.naming {
            SourceNaming::Random => None,
            SourceNaming::PublicClass => Some(
                public_class_name(code)
                    .unwrap_or(DEFAULT_CLASS_NAME)
                    .to_owned(),
            ),
        }
    }

    /// Expand placeholders in the given command
    pub fn expand_command(command: &[String], vars: &Placeholders) -> Vec<String> {
        command
            .iter()
            .map(|arg| {
                arg.replace("{source}", &vars.source)
                    .replace("{output}", &vars.output)
                    .replace("{binary}", &vars.output)
                    .replace("{dir}", &vars.dir)
                    .replace("{stem}", &vars.stem)
                    .replace("{class}", &vars.stem)
            })
            .collect()
    }
}

/// Extract the name of the first `public class` declared in Java source
pub fn public_class_name(code: &str) -> Option<&str> {
    PUBLIC_CLASS
        .captures(code)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Values substituted into compile and run commands
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placeholders {
    /// `{source}`: path of the source file
    pub source: String,
    /// `{output}` / `{binary}`: path of the compiled artifact
    pub output: String,
    /// `{dir}`: directory holding the workspace files
    pub dir: String,
    /// `{stem}` / `{class}`: file stem shared by source and artifact
    pub stem: String,
}

/// Strategy for naming the source file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceNaming {
    /// 32 hex characters of randomness
    #[default]
    Random,

    /// Name of the `public class` in the source, `Main` if absent.
    /// The Java toolchain requires the file name to match the class.
    PublicClass,
}

/// File extension without dot (e.g., "cpp")
#[derive(Debug, Clone, Serialize)]
pub struct FileExtension(String);

impl FileExtension {
    pub fn new(extension: &str) -> Result<Self, ConfigError> {
        if extension.contains(INVALID_FILE_EXT_CHARS) {
            return Err(ConfigError::InvalidFileExtChars);
        }
        Ok(Self(extension.to_owned()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for FileExtension {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FileExtension::new(&s).map_err(|_| {
            de::Error::invalid_value(
                de::Unexpected::Str(&s),
                &"a file extension without '/' or '.' characters",
            )
        })
    }
}

impl std::fmt::Display for FileExtension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Configuration for the compilation step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileConfig {
    /// Command and arguments with placeholders
    pub command: Vec<String>,

    /// File name of the compiler's product, relative to the workspace
    /// directory. `{stem}` is replaced by the source file stem.
    #[serde(default = "default_artifact")]
    pub artifact: String,

    /// Environment variables to set during compilation
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Resource limits for compilation (overrides defaults)
    #[serde(default)]
    pub limits: Option<ResourceLimits>,
}

impl CompileConfig {
    /// Artifact file name for the given stem
    pub fn artifact_name(&self, stem: &str) -> String {
        self.artifact.replace("{stem}", stem)
    }
}

fn default_artifact() -> String {
    "{stem}".to_owned()
}

/// Configuration for the execution step
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    /// Command and arguments with placeholders
    #[serde(default)]
    pub command: Vec<String>,

    /// Environment variables to set
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Resource limits for execution (overrides defaults)
    #[serde(default)]
    pub limits: Option<ResourceLimits>,
}
