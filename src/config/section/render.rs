//! `[render]` section: how workers host the compiled render module.
//!
//! # Example
//!
//! ```toml
//! [render]
//! command = ["node", "render-host.js", "$PAGESMITH_RENDER_MODULE"]
//! ```

use crate::config::ConfigDiagnostics;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Runtime command started once per worker. Speaks the line-delimited
    /// JSON render protocol on stdin/stdout.
    pub command: Vec<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            command: vec!["node".into(), "$PAGESMITH_RENDER_MODULE".into()],
        }
    }
}

impl RenderConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.command.is_empty() {
            diag.error("render.command", "no render runtime configured");
        }
    }
}
