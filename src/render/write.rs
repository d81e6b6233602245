//! Persist a rendered page into the output tree.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use super::PagePayload;
use crate::core::{DATA_FILE, RoutePath};

/// Write `payload` for `route` under `output_dir`.
///
/// Returns the page file path. Every route owns a distinct directory, so
/// concurrent Workers never touch the same file.
pub fn write_page(output_dir: &Path, route: &RoutePath, payload: &PagePayload) -> Result<PathBuf> {
    let page_file = route
        .page_file(output_dir)
        .ok_or_else(|| anyhow!("route `{route}` escapes the output directory"))?;
    let dir = page_file
        .parent()
        .ok_or_else(|| anyhow!("route `{route}` has no output directory"))?;

    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    fs::write(&page_file, &payload.html)
        .with_context(|| format!("Failed to write {}", page_file.display()))?;

    if let Some(content) = &payload.content {
        let data_file = dir.join(DATA_FILE);
        let json = serde_json::to_vec(content)?;
        fs::write(&data_file, json)
            .with_context(|| format!("Failed to write {}", data_file.display()))?;
    }

    Ok(page_file)
}
