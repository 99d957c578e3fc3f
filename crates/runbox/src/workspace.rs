//! Scratch space for execution requests
//!
//! Every request gets a source file (and, for compiled languages, an
//! artifact path) under the shared temp directory. Nothing outlives the
//! request: [`Workspace::release`] removes every recorded path on all exit
//! paths, and `Drop` catches the ones that were never released.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::config::{Isolation, Language, Placeholders};

/// Errors raised while preparing a workspace
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to create temp directory {}: {source}", path.display())]
    CreateRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create workspace directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 16 random bytes as 32 lowercase hex characters
pub fn random_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn file_name(stem: &str, extension: &str) -> String {
    if extension.is_empty() {
        stem.to_owned()
    } else {
        format!("{stem}.{extension}")
    }
}

/// Fresh, randomly named path inside `dir`
fn allocate_in(dir: &Path, extension: &str) -> PathBuf {
    dir.join(file_name(&random_id(), extension))
}

/// The shared temp directory all workspaces live under
#[derive(Debug, Clone)]
pub struct WorkspaceRoot {
    root: PathBuf,
    isolation: Isolation,
}

impl WorkspaceRoot {
    pub fn new(root: impl Into<PathBuf>, isolation: Isolation) -> Self {
        Self {
            root: root.into(),
            isolation,
        }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn isolation(&self) -> Isolation {
        self.isolation
    }

    /// Create the temp directory if it is missing. Safe to call repeatedly.
    pub async fn ensure(&self) -> Result<(), WorkspaceError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| WorkspaceError::CreateRoot {
                path: self.root.clone(),
                source,
            })?;
        debug!(root = %self.root.display(), "temp directory ready");
        Ok(())
    }

    /// Pick a fresh, randomly named path with the given extension.
    /// Nothing is created on disk.
    pub fn allocate(&self, extension: &str) -> PathBuf {
        allocate_in(&self.root, extension)
    }

    /// Lay out a workspace for `language` and write `code` into it.
    ///
    /// On failure every path created so far is removed before returning.
    #[instrument(skip(self, language, code), fields(language = %language.name))]
    pub async fn open(&self, language: &Language, code: &str) -> Result<Workspace, WorkspaceError> {
        let (dir, private_dir) = match self.isolation {
            Isolation::Shared => (self.root.clone(), false),
            Isolation::PerRequest => {
                let dir = self.root.join(random_id());
                tokio::fs::create_dir_all(&dir)
                    .await
                    .map_err(|source| WorkspaceError::CreateDir {
                        path: dir.clone(),
                        source,
                    })?;
                (dir, true)
            }
        };

        let extension = language.extension.as_str();
        let source = match language.source_stem(code) {
            Some(stem) => dir.join(file_name(&stem, extension)),
            None => allocate_in(&dir, extension),
        };
        let stem = source
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let artifact = language
            .compile
            .as_ref()
            .map(|compile| dir.join(compile.artifact_name(&stem)));

        let workspace = Workspace {
            dir,
            stem,
            source,
            artifact,
            private_dir,
            released: false,
        };

        if let Err(source) = tokio::fs::write(&workspace.source, code).await {
            let path = workspace.source.clone();
            workspace.release().await;
            return Err(WorkspaceError::Write { path, source });
        }

        debug!(
            source = %workspace.source.display(),
            artifact = ?workspace.artifact,
            "wrote source file"
        );
        Ok(workspace)
    }
}

/// Files belonging to one execution request
#[derive(Debug)]
pub struct Workspace {
    dir: PathBuf,
    stem: String,
    source: PathBuf,
    artifact: Option<PathBuf>,
    private_dir: bool,
    released: bool,
}

impl Workspace {
    /// Directory holding the source and artifact
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Where the compiler is expected to leave its product
    pub fn artifact(&self) -> Option<&Path> {
        self.artifact.as_deref()
    }

    /// Every path release will remove
    pub fn paths(&self) -> Vec<&Path> {
        let mut paths = vec![self.source.as_path()];
        paths.extend(self.artifact.as_deref());
        if self.private_dir {
            paths.push(self.dir.as_path());
        }
        paths
    }

    /// Values for command placeholders
    pub fn placeholders(&self) -> Placeholders {
        let source = self.source.to_string_lossy().into_owned();
        Placeholders {
            output: self
                .artifact
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_else(|| source.clone()),
            source,
            dir: self.dir.to_string_lossy().into_owned(),
            stem: self.stem.clone(),
        }
    }

    /// Delete every file of this workspace, ignoring individual failures
    #[instrument(skip(self), fields(stem = %self.stem))]
    pub async fn release(mut self) {
        for path in [Some(&self.source), self.artifact.as_ref()].into_iter().flatten() {
            match tokio::fs::remove_file(path).await {
                Ok(()) => debug!(path = %path.display(), "removed"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => debug!(path = %path.display(), error = %e, "failed to remove"),
            }
        }
        if self.private_dir
            && let Err(e) = tokio::fs::remove_dir_all(&self.dir).await
            && e.kind() != ErrorKind::NotFound
        {
            debug!(dir = %self.dir.display(), error = %e, "failed to remove workspace directory");
        }
        self.released = true;
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        warn!(
            source = %self.source.display(),
            "Workspace dropped without release, removing files synchronously"
        );

        let _ = std::fs::remove_file(&self.source);
        if let Some(ref artifact) = self.artifact {
            let _ = std::fs::remove_file(artifact);
        }
        if self.private_dir {
            let _ = std::fs::remove_dir_all(&self.dir);
        }
    }
}
