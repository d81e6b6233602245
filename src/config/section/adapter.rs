//! `[adapter]` section: deployment handoff.
//!
//! # Example
//!
//! ```toml
//! [adapter]
//! command = ["node", "adapters/netlify.js"]
//! ```
//!
//! The command receives the adapter input as JSON on stdin. Without a
//! command the adapter step is skipped.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    pub command: Vec<String>,
}

impl AdapterConfig {
    pub fn is_configured(&self) -> bool {
        !self.command.is_empty()
    }
}
