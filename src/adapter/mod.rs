//! Deployment adapter handoff, invoked once after a successful render.
//!
//! The adapter receives one JSON document describing the finished build:
//!
//! ```json
//! {
//!   "renderFunctionFilePath": "/site/.pagesmith/render.js",
//!   "routePatterns": [...],
//!   "apiRoutePatterns": [...],
//!   "portsFilePath": "/site/.pagesmith/compiled-ports/ports.js",
//!   "htmlTemplate": "<!DOCTYPE html>..."
//! }
//! ```

mod command;

pub use command::CommandAdapter;

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use serde::Serialize;
use serde_json::Value;

use crate::build::BuildError;
use crate::config::SiteConfig;
use crate::log;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterInput {
    pub render_function_file_path: PathBuf,
    pub route_patterns: Value,
    pub api_route_patterns: Value,
    pub ports_file_path: Option<PathBuf>,
    pub html_template: String,
}

pub trait Adapter: Send + Sync {
    fn run(&self, input: &AdapterInput) -> Result<(), BuildError>;
}

/// Used when `[adapter]` has no command.
pub struct SkipAdapter;

impl Adapter for SkipAdapter {
    fn run(&self, _input: &AdapterInput) -> Result<(), BuildError> {
        log!("adapter"; "no adapter configured, skipping adapter step");
        Ok(())
    }
}

/// Adapter selected by `[adapter]`.
pub fn from_config(config: &SiteConfig, vars: &FxHashMap<String, String>) -> Box<dyn Adapter> {
    if config.adapter.is_configured() {
        Box::new(CommandAdapter::new(
            &config.adapter.command,
            config.get_root(),
            vars,
        ))
    } else {
        Box::new(SkipAdapter)
    }
}

/// Read a pattern list written by the render module.
///
/// A missing file is an empty list; malformed JSON is an error.
pub fn read_patterns(path: &Path) -> Result<Value, BuildError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            log!("adapter"; "{} not found, using an empty list", path.display());
            return Ok(Value::Array(Vec::new()));
        }
        Err(err) => return Err(BuildError::io(path, err)),
    };
    serde_json::from_str(&content)
        .map_err(|e| BuildError::Adapter(format!("invalid JSON in {}: {e}", path.display())))
}
