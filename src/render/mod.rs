//! Render backend: the external program that turns a route into a page.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  spawn(bootstrap)   ┌───────────────────────┐
//! │  BackendFactory  │ ──────────────────► │  Box<dyn RenderBackend>│
//! └──────────────────┘   (once per Worker) └───────────────────────┘
//!                                               │ all_paths()
//!                                               │ render(request)
//!                                               ▼
//!                                  Vec<RoutePath> / PagePayload
//! ```
//!
//! A backend is owned by exactly one Worker thread and never shared, so the
//! trait only requires `Send`. The Worker persists the payload itself
//! (see [`write_page`]).

mod process;
mod protocol;
mod write;

pub use process::ProcessBackendFactory;
pub use protocol::{Bootstrap, Request, Response};
pub use write::write_page;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{RenderMode, RoutePath};

/// Pathname the backend answers with its full route list.
pub const ALL_PATHS_PATHNAME: &str = "/all-paths.json";

/// One page render job.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub route: RoutePath,
    pub mode: RenderMode,
    /// Compiled bridge script, when the project has one.
    pub ports: Option<PathBuf>,
}

/// Rendered page as returned by the backend.
///
/// `html` is written verbatim; `content` (when present) is serialized next to
/// it so the client can hydrate without re-rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PagePayload {
    pub html: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<serde_json::Value>,
}

/// Failure reported for a single backend call.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The backend answered with an `error` response. The backend stays usable.
    #[error("{0}")]
    Page(String),

    /// The backend broke the protocol or died. The Worker slot must be retired.
    #[error("render backend fault: {0}")]
    Fault(String),
}

impl RenderError {
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::Fault(_))
    }
}

/// One loaded instance of the render program.
pub trait RenderBackend: Send {
    /// Enumerate every route the site produces.
    fn all_paths(&mut self) -> Result<Vec<RoutePath>, RenderError>;

    /// Render one route.
    fn render(&mut self, request: &RenderRequest) -> Result<PagePayload, RenderError>;
}

/// Creates one backend per Worker.
pub trait BackendFactory: Send + Sync {
    fn spawn(&self, bootstrap: &Bootstrap) -> Result<Box<dyn RenderBackend>, RenderError>;
}
