//! `[build]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [build]
//! output = "dist"                 # Output tree handed to the adapter
//! work_dir = ".pagesmith"         # Intermediate sources and compiled modules
//! base = "/docs/"                 # URL base path (or derive it from site_url)
//! site_url = "https://example.github.io/docs"
//! debug = false                   # Debug compile, no optimizer, no minifier
//! workers = 7                     # Render workers (default: cores - 1)
//! worker_timeout = 120            # Seconds without worker progress before faulting busy workers
//! template = "shell.html"         # Custom HTML shell (default: built-in)
//! client_entry = ".pagesmith/client/Main"
//! render_entry = ".pagesmith/render/Main"
//! client_script = "main.js"
//! ports_entry = "port-data-source"
//! ```

use crate::config::ConfigDiagnostics;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSectionConfig {
    /// Build output directory.
    pub output: PathBuf,

    /// Directory for generated sources and compiled render modules.
    pub work_dir: PathBuf,

    /// URL base path the site is served from. Always `/`-delimited after load.
    pub base: String,

    /// Public site URL; its path component becomes `base` when set.
    pub site_url: Option<String>,

    /// Debug build: skip optimizer and minifier.
    pub debug: bool,

    /// Number of render workers (default: available parallelism - 1, at least 1).
    pub workers: Option<usize>,

    /// Seconds without any worker message while jobs are in flight before
    /// the busy workers are treated as faulted. Unset = wait forever.
    pub worker_timeout: Option<u64>,

    /// Custom HTML shell template (default: built-in shell).
    pub template: Option<PathBuf>,

    /// Entry module of the client program.
    pub client_entry: PathBuf,

    /// Entry module of the render (CLI-facing) program.
    pub render_entry: PathBuf,

    /// File name of the compiled client script inside the output dir.
    pub client_script: String,

    /// Bridge script source, resolved with and without script extensions.
    pub ports_entry: PathBuf,

    /// Clean output directory before building (CLI only).
    #[serde(skip)]
    pub clean: bool,
}

impl Default for BuildSectionConfig {
    fn default() -> Self {
        Self {
            output: "dist".into(),
            work_dir: ".pagesmith".into(),
            base: "/".into(),
            site_url: None,
            debug: false,
            workers: None,
            worker_timeout: None,
            template: None,
            client_entry: ".pagesmith/client/Main".into(),
            render_entry: ".pagesmith/render/Main".into(),
            client_script: "main.js".into(),
            ports_entry: "port-data-source".into(),
            clean: false,
        }
    }
}

impl BuildSectionConfig {
    /// Worker count: configured value, or one less than available parallelism.
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            let cores = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(2);
            cores.saturating_sub(1)
        })
        .max(1)
    }

    /// Normalize `base` to `/segment/.../` form (`/` for the root).
    pub fn normalize_base(&mut self) {
        let trimmed = self.base.trim().trim_matches('/');
        self.base = if trimmed.is_empty() {
            "/".into()
        } else {
            format!("/{trimmed}/")
        };
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.workers == Some(0) {
            diag.error_with_hint(
                "build.workers",
                "must be at least 1",
                "remove the field to use one worker per spare core",
            );
        }
        if self.worker_timeout == Some(0) {
            diag.error("build.worker_timeout", "must be greater than 0 seconds");
        }
        if self.client_script.is_empty() || self.client_script.contains(['/', '\\']) {
            diag.error_with_hint(
                "build.client_script",
                "must be a plain file name",
                "e.g. \"main.js\"",
            );
        }
        if self.base.contains(['?', '#', ' ']) {
            diag.error("build.base", "must be a plain URL path");
        }
    }
}
