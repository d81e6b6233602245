//! Build failure taxonomy.
//!
//! `BuildError` is the single result type threaded through every stage.
//! Page render failures and worker faults never escape the pool as `Err`;
//! they are collected into the pool's `BuildOutcome` and
//! surface here only when the orchestrator reports the drain as failed.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::RoutePath;

#[derive(Debug, Error)]
pub enum BuildError {
    /// An external tool (codegen, compiler, optimizer, bundler, minifier,
    /// bridge compiler) failed or produced unexpected output.
    #[error("{tool} failed:\n{message}")]
    ExternalTool { tool: &'static str, message: String },

    /// Required executable not on `PATH`.
    #[error("required executable `{program}` not found on PATH ({field})")]
    MissingExecutable { program: String, field: &'static str },

    /// Route enumeration failed.
    #[error("route discovery failed:\n{0}")]
    Discovery(String),

    /// One route failed to render.
    #[error("failed to render `{route}`:\n{message}")]
    PageRender { route: RoutePath, message: String },

    /// A worker died outside the response protocol.
    #[error("render worker {worker} faulted{}: {message}", .route.as_ref().map(|r| format!(" on `{r}`")).unwrap_or_default())]
    WorkerFault {
        worker: usize,
        route: Option<RoutePath>,
        message: String,
    },

    /// The pool drained with recorded failures.
    #[error("{failed} of {rendered} page job(s) failed")]
    RenderFailed { rendered: usize, failed: usize },

    /// Expected placeholder absent from the HTML shell.
    #[error("template placeholder `{placeholder}` not found in {}", .template.display())]
    ManifestTemplateMismatch {
        placeholder: String,
        template: PathBuf,
    },

    /// Bundler manifest missing or malformed.
    #[error("invalid bundler manifest {}: {message}", .path.display())]
    Manifest { path: PathBuf, message: String },

    #[error("adapter failed:\n{0}")]
    Adapter(String),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    pub fn tool(tool: &'static str, err: impl std::fmt::Display) -> Self {
        Self::ExternalTool {
            tool,
            message: err.to_string(),
        }
    }

    /// Wrap an `anyhow` chain from a `Cmd` run, keeping every cause.
    pub fn tool_chain(tool: &'static str, err: &anyhow::Error) -> Self {
        Self::ExternalTool {
            tool,
            message: format!("{err:#}"),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Failures the pool absorbs without stopping the drain.
    pub fn is_page_level(&self) -> bool {
        matches!(self, Self::PageRender { .. } | Self::WorkerFault { .. })
    }
}

/// Extension for attaching a path to `io::Result`.
pub trait IoContext<T> {
    fn at(self, path: impl Into<PathBuf>) -> Result<T, BuildError>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn at(self, path: impl Into<PathBuf>) -> Result<T, BuildError> {
        self.map_err(|e| BuildError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_fault_message() {
        let err = BuildError::WorkerFault {
            worker: 2,
            route: Some(RoutePath::new("/about")),
            message: "render process exited".into(),
        };
        assert_eq!(
            err.to_string(),
            "render worker 2 faulted on `/about`: render process exited"
        );
        assert!(err.is_page_level());

        let err = BuildError::WorkerFault {
            worker: 0,
            route: None,
            message: "spawn failed".into(),
        };
        assert_eq!(err.to_string(), "render worker 0 faulted: spawn failed");
    }

    #[test]
    fn test_io_context() {
        let result: std::io::Result<()> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        let err = result.at("/site/dist/main.js").unwrap_err();
        assert_eq!(err.to_string(), "/site/dist/main.js: gone");
        assert!(!err.is_page_level());
    }
}
