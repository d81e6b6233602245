//! Pipeline orchestrator.
//!
//! # Stages
//!
//! ```text
//! generate ─► compile client ⟂ bundle ─► fingerprint ─► rewrite shell
//!          ─► compile ports ⟂ compile render module ─► pool (discover + drain)
//!          ─► relocate 404 ─► adapter
//! ```
//!
//! Stages run strictly in order and the first failing stage ends the build.
//! Parallel pairs (`⟂`) always both finish before the failure is reported,
//! and a started pool always drains.

mod error;

#[cfg(test)]
mod tests;

pub use error::{BuildError, IoContext};

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::adapter::{self, Adapter, AdapterInput, read_patterns};
use crate::asset::{
    self, AssetRecord, ShellRewrite, fingerprint_file, read_manifest, rewrite_manifest,
};
use crate::config::SiteConfig;
use crate::core::{BuildMode, DATA_FILE, NOT_FOUND_ROUTE, PAGE_FILE, RenderMode, RoutePath};
use crate::embed::build::{SHELL_HTML, ShellVars};
use crate::pool::{Pool, PoolOptions, PoolReport};
use crate::render::{BackendFactory, Bootstrap, ProcessBackendFactory};
use crate::toolchain::{CommandToolchain, CompileTarget, Toolchain, require_executables};
use crate::utils::fs::{ensure_dir, ensure_parent, remove_file_if_exists};
use crate::utils::plural_count;
use crate::utils::vars::{build_vars, resolve_args};
use crate::{debug, log};

/// What a successful build produced.
#[derive(Debug)]
pub struct BuildSummary {
    pub pages: usize,
    pub client_script: AssetRecord,
    pub template: PathBuf,
}

pub struct Pipeline {
    config: Arc<SiteConfig>,
    toolchain: Arc<dyn Toolchain>,
    backends: Arc<dyn BackendFactory>,
    adapter: Arc<dyn Adapter>,
    progress: bool,
}

impl Pipeline {
    pub fn new(
        config: Arc<SiteConfig>,
        toolchain: Arc<dyn Toolchain>,
        backends: Arc<dyn BackendFactory>,
        adapter: Arc<dyn Adapter>,
    ) -> Self {
        Self {
            config,
            toolchain,
            backends,
            adapter,
            progress: false,
        }
    }

    /// Pipeline driving the configured external commands.
    ///
    /// Fails before anything runs when a required executable is missing.
    pub fn from_config(config: Arc<SiteConfig>) -> Result<Self, BuildError> {
        let vars = build_vars(&config);
        let toolchain = CommandToolchain::new(Arc::clone(&config), vars.clone());
        require_executables(&config, &vars, toolchain.has_ports())?;

        let backends = ProcessBackendFactory::new(
            resolve_args(&config.render.command, &vars),
            config.get_root().to_path_buf(),
            vars.clone(),
        );
        let adapter: Arc<dyn Adapter> = Arc::from(adapter::from_config(&config, &vars));

        Ok(Self::new(
            config,
            Arc::new(toolchain),
            Arc::new(backends),
            adapter,
        ))
    }

    /// Show the page progress line while the pool drains.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub async fn run(&self) -> Result<BuildSummary, BuildError> {
        let started = Instant::now();
        let paths = self.config.paths();

        self.prepare_dirs()?;

        let toolchain = Arc::clone(&self.toolchain);
        blocking(move || toolchain.generate()).await?;
        self.write_shell_entry()?;

        log!("build"; "compiling client and bundling assets");
        self.compile_client_and_bundle().await?;

        let client_script = fingerprint_file(&paths.client_output()).at(paths.client_output())?;
        debug!("asset"; "client script -> {}", client_script.final_name());

        let template = self.rewrite_shell(&client_script)?;

        log!("build"; "compiling render module");
        let ports = self.compile_render_module().await?;

        let pages = self.render_pages(ports.clone()).await?;
        self.relocate_not_found()?;

        let html_template = fs::read_to_string(&template).at(&template)?;
        let input = AdapterInput {
            render_function_file_path: paths.render_module(),
            route_patterns: read_patterns(&paths.route_patterns())?,
            api_route_patterns: read_patterns(&paths.api_patterns())?,
            ports_file_path: ports,
            html_template,
        };
        let adapter = Arc::clone(&self.adapter);
        blocking(move || adapter.run(&input)).await?;

        log!("done"; "built {} in {:.2?}", plural_count(pages, "page"), started.elapsed());
        Ok(BuildSummary {
            pages,
            client_script,
            template,
        })
    }

    fn prepare_dirs(&self) -> Result<(), BuildError> {
        let output = &self.config.build.output;
        if self.config.build.clean && output.exists() {
            debug!("build"; "cleaning {}", output.display());
            fs::remove_dir_all(output).at(output)?;
        }
        ensure_dir(output).at(output)?;
        ensure_dir(&self.config.build.work_dir).at(&self.config.build.work_dir)?;
        Ok(())
    }

    /// Write the HTML shell the bundler starts from.
    fn write_shell_entry(&self) -> Result<(), BuildError> {
        let shell = match &self.config.build.template {
            Some(path) => fs::read_to_string(path).at(path)?,
            None => SHELL_HTML.render(&ShellVars {
                client_script: &self.config.build.client_script,
            }),
        };
        let entry = self.config.paths().shell_entry();
        ensure_parent(&entry).at(&entry)?;
        fs::write(&entry, shell).at(&entry)
    }

    /// Client compile (plus minify in production) alongside the bundler.
    async fn compile_client_and_bundle(&self) -> Result<(), BuildError> {
        let toolchain = Arc::clone(&self.toolchain);
        let client_output = self.config.paths().client_output();
        let mode = BuildMode::from_debug(self.config.build.debug);

        let (compiled, bundled) = blocking(move || {
            Ok(rayon::join(
                || -> Result<(), BuildError> {
                    toolchain.compile(CompileTarget::Client)?;
                    if mode.minify {
                        asset::minify::minify_file(&client_output)
                            .map_err(|e| BuildError::tool_chain("minifier", &e))?;
                    }
                    Ok(())
                },
                || toolchain.bundle(),
            ))
        })
        .await?;

        first_error([compiled, bundled])
    }

    /// Insert preloads and the hashed script into the bundled shell, write
    /// `template.html`, drop the manifest.
    fn rewrite_shell(&self, client_script: &AssetRecord) -> Result<PathBuf, BuildError> {
        let paths = self.config.paths();
        let manifest_path = paths.manifest();
        let manifest = read_manifest(&manifest_path).map_err(|e| BuildError::Manifest {
            path: manifest_path.clone(),
            message: format!("{e:#}"),
        })?;

        let entry_key = paths.shell_manifest_key();
        let entry = manifest.get(&entry_key).ok_or_else(|| BuildError::Manifest {
            path: manifest_path.clone(),
            message: format!("no entry for `{entry_key}`"),
        })?;

        let shell_path = paths.bundled_shell();
        let shell = fs::read_to_string(&shell_path).at(&shell_path)?;
        let rewritten = rewrite_manifest(
            &shell,
            &ShellRewrite {
                entry_file: &entry.file,
                client_script: &self.config.build.client_script,
                base: &self.config.build.base,
            },
            client_script,
        )
        .map_err(|missing| BuildError::ManifestTemplateMismatch {
            placeholder: missing.0,
            template: shell_path.clone(),
        })?;

        let template = paths.template_output();
        fs::write(&template, rewritten).at(&template)?;
        remove_file_if_exists(&manifest_path).at(&manifest_path)?;
        Ok(template)
    }

    /// Bridge script alongside the render module. On a render module
    /// failure the review tool gets a chance to explain it.
    async fn compile_render_module(&self) -> Result<Option<PathBuf>, BuildError> {
        let toolchain = Arc::clone(&self.toolchain);
        let (ports, render) = blocking(move || {
            Ok(rayon::join(
                || toolchain.compile_ports(),
                || toolchain.compile(CompileTarget::Render),
            ))
        })
        .await?;

        if let Err(compile_error) = render {
            if let Err(ports_error) = &ports {
                log!("error"; "{}", ports_error);
            }
            let toolchain = Arc::clone(&self.toolchain);
            let review = blocking(move || toolchain.review()).await;
            return Err(explain_compile_error(compile_error, review));
        }
        ports
    }

    async fn render_pages(&self, ports: Option<PathBuf>) -> Result<usize, BuildError> {
        let build = &self.config.build;
        let options = PoolOptions {
            workers: build.worker_count(),
            bootstrap: Bootstrap {
                base_path: build.base.clone(),
            },
            output_dir: build.output.clone(),
            mode: RenderMode::Build,
            ports,
            timeout: build.worker_timeout.map(Duration::from_secs),
            progress: self.progress,
        };

        let mut pool = Pool::spawn(options, Arc::clone(&self.backends))
            .map_err(|e| BuildError::io(&build.output, e))?;
        match pool.discovered().await {
            Ok(count) => log!("render"; "{}", plural_count(count, "page")),
            Err(message) => debug!("render"; "discovery failed: {}", message),
        }

        let PoolReport {
            outcome,
            pending,
            dispatched,
        } = pool.drained().await;
        debug!("render"; "{} jobs dispatched, {} left in queue", dispatched, pending);
        if outcome.succeeded {
            return Ok(outcome.rendered_count);
        }

        if let Some(BuildError::Discovery(message)) = outcome.discovery_error() {
            return Err(BuildError::Discovery(message.clone()));
        }
        let failed = outcome.failed_pages();
        log!("error"; "{} failed to render", plural_count(failed, "page"));
        Err(BuildError::RenderFailed {
            rendered: outcome.rendered_count,
            failed,
        })
    }

    /// Move the not-found route's page to `404.html`.
    fn relocate_not_found(&self) -> Result<(), BuildError> {
        let paths = self.config.paths();
        let output = paths.output_dir();
        let rendered = RoutePath::new(NOT_FOUND_ROUTE)
            .page_file(output)
            .unwrap_or_else(|| output.join(PAGE_FILE));
        let target = paths.not_found_output();
        fs::rename(&rendered, &target).at(&rendered)?;

        let data = rendered.with_file_name(DATA_FILE);
        remove_file_if_exists(&data).at(&data)?;

        // Prune the route's directories while empty; other pages may live
        // under the same prefix.
        let mut dir = rendered.parent();
        while let Some(current) = dir.filter(|d| *d != output && d.starts_with(output)) {
            if fs::remove_dir(current).is_err() {
                break;
            }
            dir = current.parent();
        }
        Ok(())
    }
}

/// Prefer the review tool's report unless it only reports a parse error
/// (or could not run), in which case the raw compiler error is clearer.
fn explain_compile_error(
    compile_error: BuildError,
    review: Result<crate::toolchain::ReviewReport, BuildError>,
) -> BuildError {
    match review {
        Ok(report) if !report.is_parsing_error() && !report.errors.is_empty() => {
            BuildError::tool("review", report.render())
        }
        Ok(_) => compile_error,
        Err(review_error) => {
            debug!("review"; "{}", review_error);
            compile_error
        }
    }
}

/// First error of a parallel pair; later errors are logged, not lost.
fn first_error(results: impl IntoIterator<Item = Result<(), BuildError>>) -> Result<(), BuildError> {
    let mut first = None;
    for result in results {
        if let Err(err) = result {
            if first.is_none() {
                first = Some(err);
            } else {
                log!("error"; "{}", err);
            }
        }
    }
    first.map_or(Ok(()), Err)
}

/// Run a blocking stage off the async runtime.
async fn blocking<T, F>(stage: F) -> Result<T, BuildError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, BuildError> + Send + 'static,
{
    tokio::task::spawn_blocking(stage)
        .await
        .unwrap_or_else(|e| Err(BuildError::tool("pipeline", format!("stage panicked: {e}"))))
}
