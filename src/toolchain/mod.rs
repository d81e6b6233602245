//! External build tools: codegen, compiler, optimizer, bundler, bridge
//! script compiler, review tool.
//!
//! The orchestrator only sees the [`Toolchain`] trait. [`CommandToolchain`]
//! drives the configured command vectors through [`Cmd`].

mod patch;
mod report;
mod require;

pub use patch::{patch_form_serialization, patch_render_module};
pub use report::{ReviewReport, render_compiler_report};
pub use require::require_executables;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::build::{BuildError, IoContext};
use crate::config::SiteConfig;
use crate::core::BuildMode;
use crate::utils::exec::{Cmd, SILENT_FILTER, strip_ansi};
use crate::utils::fs::{ensure_parent, remove_file_if_exists};
use crate::utils::vars::resolve_args;
use crate::{debug, log};

/// Which program the compiler builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileTarget {
    /// Browser program (`dist/main.js`).
    Client,
    /// Render module loaded by every worker.
    Render,
}

impl CompileTarget {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Render => "render module",
        }
    }
}

/// Extensions tried for the bridge script source, in order.
const PORTS_EXTENSIONS: [&str; 5] = ["", "js", "ts", "mjs", "cjs"];

pub trait Toolchain: Send + Sync {
    /// Generate intermediate program sources.
    fn generate(&self) -> Result<(), BuildError>;

    /// Compile (and, in production, optimize) `target`, then apply the
    /// post-compile patches.
    fn compile(&self, target: CompileTarget) -> Result<(), BuildError>;

    /// Bundle client assets; leaves the manifest in the output dir.
    fn bundle(&self) -> Result<(), BuildError>;

    /// Compile the bridge script. `Ok(None)` when the project has none.
    fn compile_ports(&self) -> Result<Option<PathBuf>, BuildError>;

    /// Run the review tool over the project.
    fn review(&self) -> Result<ReviewReport, BuildError>;
}

/// Toolchain backed by the `[toolchain]` command vectors.
pub struct CommandToolchain {
    config: Arc<SiteConfig>,
    vars: FxHashMap<String, String>,
    mode: BuildMode,
}

impl CommandToolchain {
    pub fn new(config: Arc<SiteConfig>, vars: FxHashMap<String, String>) -> Self {
        let mode = BuildMode::from_debug(config.build.debug);
        Self { config, vars, mode }
    }

    fn cmd(&self, command: &[String]) -> Cmd {
        Cmd::from_slice(&resolve_args(command, &self.vars))
            .cwd(self.config.get_root())
            .envs(&self.vars)
    }

    fn entry_and_output(&self, target: CompileTarget) -> (&Path, PathBuf) {
        let paths = self.config.paths();
        match target {
            CompileTarget::Client => (self.config.build.client_entry.as_path(), paths.client_output()),
            CompileTarget::Render => (self.config.build.render_entry.as_path(), paths.render_module()),
        }
    }

    /// Success needs exit 0, the output file, and nothing on stderr.
    fn run_compiler(&self, entry: &Path, output: &Path) -> Result<(), BuildError> {
        remove_file_if_exists(output).at(output)?;
        ensure_parent(output).at(output)?;

        let result = self
            .cmd(&self.config.toolchain.compiler)
            .arg(entry)
            .arg("--output")
            .arg(output)
            .arg(self.mode.compiler_flag())
            .args(["--report", "json"])
            .run_unchecked()
            .map_err(|e| BuildError::tool_chain("compiler", &e))?;

        let stderr = String::from_utf8_lossy(&result.stderr);
        if result.status.success() && output.exists() && stderr.is_empty() {
            return Ok(());
        }

        let message = render_compiler_report(&stderr)
            .unwrap_or_else(|| strip_ansi(stderr.trim()).into_owned());
        let message = if message.is_empty() {
            format!("exited with {} without producing {}", result.status, output.display())
        } else {
            message
        };
        Err(BuildError::tool("compiler", message))
    }

    /// Optimizer pass to `<out>.opt`, copied back over `<out>`.
    fn run_optimizer(&self, output: &Path) -> Result<(), BuildError> {
        let optimizer = &self.config.toolchain.optimizer;
        if !self.mode.optimize || optimizer.is_empty() {
            return Ok(());
        }

        let mut optimized = output.as_os_str().to_owned();
        optimized.push(".opt");
        let optimized = PathBuf::from(optimized);

        let result = self
            .cmd(optimizer)
            .arg(output)
            .arg("--output")
            .arg(&optimized)
            .run_unchecked()
            .map_err(|e| BuildError::tool_chain("optimizer", &e))?;

        let stderr = String::from_utf8_lossy(&result.stderr);
        if !(result.status.success() && stderr.is_empty() && optimized.exists()) {
            let message = strip_ansi(stderr.trim()).into_owned();
            return Err(BuildError::tool("optimizer", message));
        }

        fs::copy(&optimized, output).at(output)?;
        remove_file_if_exists(&optimized).at(&optimized)?;
        Ok(())
    }

    fn find_ports_source(&self) -> Option<PathBuf> {
        let base = &self.config.build.ports_entry;
        PORTS_EXTENSIONS
            .iter()
            .map(|ext| {
                if ext.is_empty() {
                    base.clone()
                } else {
                    base.with_extension(ext)
                }
            })
            .find(|candidate| candidate.is_file())
    }

    /// Whether a bridge script source exists (and a compiler is configured).
    pub fn has_ports(&self) -> bool {
        !self.config.toolchain.ports.is_empty() && self.find_ports_source().is_some()
    }
}

impl Toolchain for CommandToolchain {
    fn generate(&self) -> Result<(), BuildError> {
        let codegen = &self.config.toolchain.codegen;
        if codegen.is_empty() {
            debug!("codegen"; "no codegen configured");
            return Ok(());
        }
        self.cmd(codegen)
            .run()
            .map_err(|e| BuildError::tool_chain("codegen", &e))?;
        Ok(())
    }

    fn compile(&self, target: CompileTarget) -> Result<(), BuildError> {
        let (entry, output) = self.entry_and_output(target);
        debug!("compile"; "{}: {} -> {}", target.name(), entry.display(), output.display());

        self.run_compiler(entry, &output)?;
        self.run_optimizer(&output)?;

        let source = fs::read_to_string(&output).at(&output)?;
        let mut patched = patch_form_serialization(&source, self.mode);
        if target == CompileTarget::Render {
            patched = patch_render_module(&patched, self.mode);
        }
        fs::write(&output, patched).at(&output)?;
        Ok(())
    }

    fn bundle(&self) -> Result<(), BuildError> {
        self.cmd(&self.config.toolchain.bundler)
            .filter(&SILENT_FILTER)
            .run()
            .map_err(|e| BuildError::tool_chain("bundler", &e))?;

        let manifest = self.config.paths().manifest();
        if !manifest.exists() {
            return Err(BuildError::tool(
                "bundler",
                format!("no manifest written to {}", manifest.display()),
            ));
        }
        Ok(())
    }

    fn compile_ports(&self) -> Result<Option<PathBuf>, BuildError> {
        if self.config.toolchain.ports.is_empty() {
            return Ok(None);
        }
        let Some(source) = self.find_ports_source() else {
            log!("ports"; "no {} file found", self.config.build.ports_entry.display());
            return Ok(None);
        };

        let output = self.config.paths().ports_output();
        ensure_parent(&output).at(&output)?;

        let mut vars = self.vars.clone();
        vars.insert(
            "PAGESMITH_PORTS_ENTRY".into(),
            source.display().to_string(),
        );
        Cmd::from_slice(&resolve_args(&self.config.toolchain.ports, &vars))
            .cwd(self.config.get_root())
            .envs(&vars)
            .run()
            .map_err(|e| BuildError::tool_chain("ports compiler", &e))?;

        if !output.exists() {
            return Err(BuildError::tool(
                "ports compiler",
                format!("no output written to {}", output.display()),
            ));
        }
        Ok(Some(output))
    }

    fn review(&self) -> Result<ReviewReport, BuildError> {
        let review = &self.config.toolchain.review;
        if review.is_empty() {
            return Err(BuildError::tool("review", "no review tool configured"));
        }
        let output = self
            .cmd(review)
            .run_unchecked()
            .map_err(|e| BuildError::tool_chain("review", &e))?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        ReviewReport::parse(&stdout).map_err(|e| BuildError::tool("review", e))
    }
}
