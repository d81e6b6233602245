//! Bundler manifest parsing and HTML shell rewriting.
//!
//! The shell carries two literal markers the rewrite depends on:
//!
//! ```html
//! <!-- PLACEHOLDER_PRELOADS -->
//! <script defer src="/main.js" type="text/javascript"></script>
//! ```
//!
//! Both must be present. A missing marker is an error, never a silent
//! no-op, so applying the rewrite twice fails on the second pass.

use std::path::Path;

use rustc_hash::FxHashMap;
use serde::Deserialize;
use thiserror::Error;

use super::AssetRecord;

/// Marker replaced with the entry preload link.
pub const PRELOAD_PLACEHOLDER: &str = "<!-- PLACEHOLDER_PRELOADS -->";

/// One bundler output chunk. Extra fields the bundler writes are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestChunk {
    pub file: String,
    #[serde(default)]
    pub is_entry: bool,
}

/// Bundler manifest: input name → output chunk.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct BundleManifest {
    chunks: FxHashMap<String, ManifestChunk>,
}

impl BundleManifest {
    pub fn parse(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn get(&self, input: &str) -> Option<&ManifestChunk> {
        self.chunks.get(input)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// A literal marker missing from the template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("placeholder `{0}` not found")]
pub struct MissingPlaceholder(pub String);

/// Inputs for [`rewrite_manifest`] besides the template itself.
#[derive(Debug, Clone, Copy)]
pub struct ShellRewrite<'a> {
    /// Output file of the shell's entry chunk (manifest `file`).
    pub entry_file: &'a str,
    /// Unhashed client script name, as referenced by the shell.
    pub client_script: &'a str,
    /// Site base path, `/`-delimited.
    pub base: &'a str,
}

/// Script tag the shell ships with for `client_script`.
pub fn script_tag(src: &str) -> String {
    format!(r#"<script defer src="{src}" type="text/javascript"></script>"#)
}

/// Insert the entry preload link and point the script tag at the hashed
/// client script.
pub fn rewrite_manifest(
    template: &str,
    shell: &ShellRewrite<'_>,
    record: &AssetRecord,
) -> Result<String, MissingPlaceholder> {
    let unhashed_tag = script_tag(&format!("/{}", shell.client_script));
    for needle in [PRELOAD_PLACEHOLDER, unhashed_tag.as_str()] {
        if !template.contains(needle) {
            return Err(MissingPlaceholder(needle.to_string()));
        }
    }

    let preload = format!(
        r#"<link rel="modulepreload" href="{}{}" />"#,
        shell.base,
        shell.entry_file.trim_start_matches('/')
    );
    let hashed_tag = script_tag(&format!("{}{}", shell.base, record.final_name()));

    Ok(template
        .replacen(PRELOAD_PLACEHOLDER, &preload, 1)
        .replacen(&unhashed_tag, &hashed_tag, 1))
}

/// Read and parse a manifest file.
pub fn read_manifest(path: &Path) -> anyhow::Result<BundleManifest> {
    let json = std::fs::read_to_string(path)?;
    Ok(BundleManifest::parse(&json)?)
}
