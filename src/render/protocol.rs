//! Line-delimited JSON messages exchanged with the render program.
//!
//! ```text
//! → {"basePath":"/docs/"}                                         (once)
//! → {"tag":"render","pathname":"/about","mode":"build","portsFilePath":null}
//! ← {"tag":"done","data":{"html":"<!DOCTYPE html>..."}}
//! ← {"tag":"error","data":"Page not found: /about"}
//! ← {"tag":"all-paths","data":"[\"/about\",\"/blog/post-1\"]"}
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{ALL_PATHS_PATHNAME, PagePayload, RenderRequest};
use crate::core::RenderMode;

/// Data every backend needs before it can render anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bootstrap {
    pub base_path: String,
}

/// Request sent to the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "kebab-case")]
pub enum Request {
    #[serde(rename_all = "camelCase")]
    Render {
        pathname: String,
        mode: RenderMode,
        ports_file_path: Option<PathBuf>,
    },
}

impl Request {
    /// The discovery request: rendering the reserved all-paths pathname.
    pub fn all_paths() -> Self {
        Self::Render {
            pathname: ALL_PATHS_PATHNAME.into(),
            mode: RenderMode::Build,
            ports_file_path: None,
        }
    }

    pub fn render(request: &RenderRequest) -> Self {
        Self::Render {
            pathname: request.route.as_str().into(),
            mode: request.mode,
            ports_file_path: request.ports.clone(),
        }
    }
}

/// Response read back from the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "tag", content = "data", rename_all = "kebab-case")]
pub enum Response {
    /// JSON-encoded array of route strings.
    AllPaths(String),
    Done(PagePayload),
    Error(String),
}
