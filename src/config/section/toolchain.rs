//! `[toolchain]` section: external tools driven by the build.
//!
//! Every entry is a command vector; arguments may use `$PAGESMITH_*`
//! variables. Tools left empty are skipped, except `compiler` and `bundler`
//! which every build needs.
//!
//! # Example
//!
//! ```toml
//! [toolchain]
//! codegen = ["pages-codegen", "--base", "$PAGESMITH_BASE"]
//! compiler = ["pagec", "make"]
//! optimizer = ["pagec-opt"]
//! review = ["pagec-review", "--report=json"]
//! bundler = ["vite", "build", "--base=$PAGESMITH_BASE", "--outDir=$PAGESMITH_OUTPUT_DIR"]
//! manifest = "manifest.json"
//! ports = ["esbuild", "$PAGESMITH_PORTS_ENTRY", "--platform=node", "--outfile=$PAGESMITH_PORTS_OUTPUT"]
//! ```

use crate::config::ConfigDiagnostics;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Generates intermediate program sources before compiling.
    pub codegen: Vec<String>,

    /// Page-description compiler. Invoked as
    /// `<compiler...> <entry> --output <file> (--optimize|--debug) --report json`.
    pub compiler: Vec<String>,

    /// Post-compile optimizer (skipped in debug). Invoked as
    /// `<optimizer...> <file> --output <file>.opt`.
    pub optimizer: Vec<String>,

    /// Secondary diagnostic pass run when the render module fails to compile.
    /// Must print a JSON report on stdout.
    pub review: Vec<String>,

    /// Client asset bundler.
    pub bundler: Vec<String>,

    /// Bundler manifest path, relative to the output dir.
    pub manifest: PathBuf,

    /// Bridge script compiler (only run when the bridge source exists).
    pub ports: Vec<String>,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            codegen: Vec::new(),
            compiler: Vec::new(),
            optimizer: Vec::new(),
            review: Vec::new(),
            bundler: vec![
                "vite".into(),
                "build".into(),
                "--base=$PAGESMITH_BASE".into(),
                "--outDir=$PAGESMITH_OUTPUT_DIR".into(),
                "--manifest=manifest.json".into(),
            ],
            manifest: "manifest.json".into(),
            ports: vec![
                "esbuild".into(),
                "$PAGESMITH_PORTS_ENTRY".into(),
                "--platform=node".into(),
                "--format=cjs".into(),
                "--outfile=$PAGESMITH_PORTS_OUTPUT".into(),
                "--log-level=error".into(),
            ],
        }
    }
}

impl ToolchainConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.compiler.is_empty() {
            diag.error_with_hint(
                "toolchain.compiler",
                "no compiler configured",
                "e.g. compiler = [\"pagec\", \"make\"]",
            );
        }
        if self.bundler.is_empty() {
            diag.error("toolchain.bundler", "no bundler configured");
        }
        if self.manifest.is_absolute() {
            diag.error("toolchain.manifest", "must be relative to the output dir");
        }
    }
}
