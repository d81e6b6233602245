//! Path resolution for every file the pipeline reads or writes.
//!
//! Single source of truth for the work/output tree layout:
//!
//! ```text
//! <root>/
//! ├── .pagesmith/                  work dir
//! │   ├── index.html               shell template (bundler entry)
//! │   ├── render.js                compiled render module
//! │   └── compiled-ports/ports.js  compiled bridge script
//! └── dist/                        output dir
//!     ├── main.js / main.<hash>.js client script
//!     ├── template.html            rewritten shell
//!     ├── 404.html                 relocated not-found page
//!     └── <route>/index.html       rendered pages
//! ```

use std::path::{Path, PathBuf};

/// Borrowed view over the configured directories.
#[derive(Debug, Clone, Copy)]
pub struct PathResolver<'a> {
    root: &'a Path,
    output: &'a Path,
    work_dir: &'a Path,
    client_script: &'a str,
    manifest: &'a Path,
}

impl<'a> PathResolver<'a> {
    pub fn new(
        root: &'a Path,
        output: &'a Path,
        work_dir: &'a Path,
        client_script: &'a str,
        manifest: &'a Path,
    ) -> Self {
        Self {
            root,
            output,
            work_dir,
            client_script,
            manifest,
        }
    }

    pub fn output_dir(&self) -> &'a Path {
        self.output
    }

    pub fn work_dir(&self) -> &'a Path {
        self.work_dir
    }

    /// Shell template written for the bundler.
    pub fn shell_entry(&self) -> PathBuf {
        self.work_dir.join("index.html")
    }

    /// Shell entry as the bundler names it in its manifest (root-relative, `/`-separated).
    pub fn shell_manifest_key(&self) -> String {
        let entry = self.shell_entry();
        let rel = entry.strip_prefix(self.root).unwrap_or(&entry);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Bundler-processed shell, mirrored under the output dir.
    pub fn bundled_shell(&self) -> PathBuf {
        let entry = self.shell_entry();
        let rel = entry.strip_prefix(self.root).unwrap_or(&entry);
        self.output.join(rel)
    }

    /// Bundler manifest file.
    pub fn manifest(&self) -> PathBuf {
        self.output.join(self.manifest)
    }

    /// Compiled (unhashed) client script.
    pub fn client_output(&self) -> PathBuf {
        self.output.join(self.client_script)
    }

    /// Client script name without its extension (`main` for `main.js`).
    pub fn client_stem(&self) -> &'a str {
        self.client_script
            .rsplit_once('.')
            .map_or(self.client_script, |(stem, _)| stem)
    }

    pub fn render_module(&self) -> PathBuf {
        self.work_dir.join("render.js")
    }

    pub fn ports_output(&self) -> PathBuf {
        self.work_dir.join("compiled-ports").join("ports.js")
    }

    pub fn template_output(&self) -> PathBuf {
        self.output.join("template.html")
    }

    pub fn not_found_output(&self) -> PathBuf {
        self.output.join("404.html")
    }

    pub fn route_patterns(&self) -> PathBuf {
        self.output.join("route-patterns.json")
    }

    pub fn api_patterns(&self) -> PathBuf {
        self.output.join("api-patterns.json")
    }
}
