//! End-to-end pipeline runs with in-process stand-ins for every external
//! tool, render backend and adapter.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use tempfile::TempDir;

use super::*;
use crate::adapter::{Adapter, AdapterInput};
use crate::cli::build::{EXIT_FAILURE, run_pipeline};
use crate::config::test_config;
use crate::logger::captured_lines;
use crate::render::{PagePayload, RenderBackend, RenderError, RenderRequest};
use crate::toolchain::ReviewReport;

// ============================================================================
// Fakes
// ============================================================================

const ENTRY_CHUNK: &str = "assets/index-7f3a.js";

#[derive(Default)]
struct FakeToolchain {
    config: Arc<SiteConfig>,
    fail_bundle: bool,
    render_error: Option<&'static str>,
    review: Option<&'static str>,
    calls: Mutex<Vec<&'static str>>,
}

impl FakeToolchain {
    fn new(config: &Arc<SiteConfig>) -> Self {
        Self {
            config: Arc::clone(config),
            ..Default::default()
        }
    }

    fn called(&self, name: &str) -> bool {
        self.calls.lock().contains(&name)
    }
}

impl Toolchain for FakeToolchain {
    fn generate(&self) -> Result<(), BuildError> {
        self.calls.lock().push("generate");
        let patterns = self.config.paths().route_patterns();
        fs::write(&patterns, r#"[{"kind":"prerender","pathPattern":"/blog/:slug"}]"#)
            .at(&patterns)
    }

    fn compile(&self, target: CompileTarget) -> Result<(), BuildError> {
        let paths = self.config.paths();
        match target {
            CompileTarget::Client => {
                self.calls.lock().push("compile client");
                let out = paths.client_output();
                fs::write(&out, "function main(flags) {\n  console.log(flags);\n}\nmain('app');\n")
                    .at(&out)
            }
            CompileTarget::Render => {
                self.calls.lock().push("compile render");
                if let Some(message) = self.render_error {
                    return Err(BuildError::tool("compiler", message));
                }
                let out = paths.render_module();
                fs::write(&out, "module.exports = {};").at(&out)
            }
        }
    }

    fn bundle(&self) -> Result<(), BuildError> {
        self.calls.lock().push("bundle");
        if self.fail_bundle {
            return Err(BuildError::tool("bundler", "could not resolve entry"));
        }
        let paths = self.config.paths();
        let bundled = paths.bundled_shell();
        ensure_parent(&bundled).at(&bundled)?;
        fs::copy(paths.shell_entry(), &bundled).at(&bundled)?;

        let manifest = format!(
            r#"{{"{}":{{"file":"{ENTRY_CHUNK}","isEntry":true}}}}"#,
            paths.shell_manifest_key()
        );
        fs::write(paths.manifest(), manifest).at(paths.manifest())
    }

    fn compile_ports(&self) -> Result<Option<PathBuf>, BuildError> {
        self.calls.lock().push("compile ports");
        Ok(None)
    }

    fn review(&self) -> Result<ReviewReport, BuildError> {
        self.calls.lock().push("review");
        match self.review {
            Some(json) => Ok(ReviewReport::parse(json).unwrap()),
            None => Err(BuildError::tool("review", "not installed")),
        }
    }
}

#[derive(Default)]
struct FakeSite {
    discovery: Option<Result<Vec<&'static str>, &'static str>>,
    broken: FxHashSet<&'static str>,
    rendered: Mutex<Vec<RoutePath>>,
}

struct FakeFactory(Arc<FakeSite>);

struct FakeBackend(Arc<FakeSite>);

impl BackendFactory for FakeFactory {
    fn spawn(&self, _bootstrap: &Bootstrap) -> Result<Box<dyn RenderBackend>, RenderError> {
        Ok(Box::new(FakeBackend(Arc::clone(&self.0))))
    }
}

impl RenderBackend for FakeBackend {
    fn all_paths(&mut self) -> Result<Vec<RoutePath>, RenderError> {
        match &self.0.discovery {
            Some(Ok(routes)) => Ok(routes.iter().map(|r| RoutePath::new(r)).collect()),
            Some(Err(message)) => Err(RenderError::Page((*message).into())),
            None => Ok(Vec::new()),
        }
    }

    fn render(&mut self, request: &RenderRequest) -> Result<PagePayload, RenderError> {
        self.0.rendered.lock().push(request.route.clone());
        if self.0.broken.contains(request.route.as_str()) {
            return Err(RenderError::Page("cannot render".into()));
        }
        Ok(PagePayload {
            html: format!("<h1>{}</h1>", request.route),
            content: Some(serde_json::json!({ "route": request.route })),
        })
    }
}

#[derive(Default)]
struct RecordingAdapter {
    input: Mutex<Option<AdapterInput>>,
    fail: bool,
}

impl Adapter for RecordingAdapter {
    fn run(&self, input: &AdapterInput) -> Result<(), BuildError> {
        *self.input.lock() = Some(input.clone());
        if self.fail {
            return Err(BuildError::Adapter("{\"reason\":\"quota\"}".into()));
        }
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    _dir: TempDir,
    config: Arc<SiteConfig>,
    toolchain: Arc<FakeToolchain>,
    site: Arc<FakeSite>,
    adapter: Arc<RecordingAdapter>,
}

impl Harness {
    fn new(extra_toml: &str, site: FakeSite) -> Self {
        let dir = TempDir::new().unwrap();
        let config = Arc::new(test_config(dir.path(), extra_toml));
        let toolchain = Arc::new(FakeToolchain::new(&config));
        Self {
            _dir: dir,
            toolchain,
            site: Arc::new(site),
            adapter: Arc::new(RecordingAdapter::default()),
            config,
        }
    }

    fn dist(&self) -> &Path {
        &self.config.build.output
    }

    fn pipeline(&self) -> Pipeline {
        Pipeline::new(
            Arc::clone(&self.config),
            self.toolchain.clone(),
            Arc::new(FakeFactory(Arc::clone(&self.site))),
            self.adapter.clone(),
        )
    }

    async fn run(&self) -> Result<BuildSummary, BuildError> {
        self.pipeline().run().await
    }
}

fn site(routes: Vec<&'static str>) -> FakeSite {
    FakeSite {
        discovery: Some(Ok(routes)),
        ..Default::default()
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_successful_build_produces_output_tree() {
    let h = Harness::new(
        "[build]\nworkers = 3\n",
        site(vec!["/about", "/blog/post-1"]),
    );
    let summary = h.run().await.unwrap();
    let dist = h.dist();

    assert_eq!(summary.pages, 3);
    assert!(dist.join("404.html").exists());
    assert!(dist.join("about/index.html").exists());
    assert!(dist.join("blog/post-1/index.html").exists());
    assert!(dist.join("blog/post-1/content.json").exists());
    assert!(!dist.join("__pagesmith__").exists());
    assert_eq!(
        fs::read_to_string(dist.join("404.html")).unwrap(),
        "<h1>/__pagesmith__/404</h1>"
    );

    // Fingerprinted client script sits next to the original.
    assert!(dist.join("main.js").exists());
    assert!(summary.client_script.final_path.exists());
    assert_eq!(summary.client_script.final_path.parent(), Some(dist));

    // Shell rewritten, manifest removed.
    let template = fs::read_to_string(dist.join("template.html")).unwrap();
    assert!(template.contains(&format!(r#"href="/{ENTRY_CHUNK}""#)));
    assert!(template.contains(&format!(r#"src="/{}""#, summary.client_script.final_name())));
    assert!(!dist.join("manifest.json").exists());

    let input = h.adapter.input.lock().clone().unwrap();
    assert_eq!(input.html_template, template);
    assert_eq!(input.route_patterns[0]["pathPattern"], "/blog/:slug");
    assert_eq!(input.api_route_patterns, serde_json::json!([]));
    assert_eq!(input.render_function_file_path, h.config.paths().render_module());
    assert!(input.ports_file_path.is_none());
}

#[tokio::test]
async fn test_routes_under_reserved_prefix_survive_relocation() {
    let h = Harness::new("", site(vec!["/__pagesmith__/keep", "/about"]));
    h.run().await.unwrap();
    let dist = h.dist();

    assert!(dist.join("404.html").exists());
    assert!(dist.join("__pagesmith__/keep/index.html").exists());
    assert!(!dist.join("__pagesmith__/404").exists());
}

#[tokio::test]
async fn test_production_build_minifies_client_script() {
    let h = Harness::new("", site(vec![]));
    h.run().await.unwrap();
    let client = fs::read_to_string(h.dist().join("main.js")).unwrap();
    assert!(!client.contains("\n  console.log"));
}

#[tokio::test]
async fn test_debug_build_keeps_client_script() {
    let h = Harness::new("[build]\ndebug = true\n", site(vec![]));
    h.run().await.unwrap();
    let client = fs::read_to_string(h.dist().join("main.js")).unwrap();
    assert!(client.contains("\n  console.log(flags);"));
}

#[tokio::test]
async fn test_page_error_fails_build_after_full_drain() {
    let h = Harness::new("[build]\nworkers = 1\n", broken_site());

    let err = h.run().await.unwrap_err();
    assert!(matches!(err, BuildError::RenderFailed { rendered: 2, failed: 1 }));
    assert_eq!(h.site.rendered.lock().len(), 2);
    assert!(h.adapter.input.lock().is_none());
    assert!(!h.dist().join("404.html").exists());
}

#[tokio::test]
async fn test_discovery_error_fails_build_without_renders() {
    let site = FakeSite {
        discovery: Some(Err("routes threw: missing data source")),
        ..Default::default()
    };
    let h = Harness::new("[build]\nworkers = 2\n", site);

    let err = h.run().await.unwrap_err();
    assert!(matches!(err, BuildError::Discovery(ref m) if m == "routes threw: missing data source"));
    assert!(h.site.rendered.lock().is_empty());
    assert!(h.adapter.input.lock().is_none());
}

// ============================================================================
// Exit status
// ============================================================================

fn broken_site() -> FakeSite {
    let mut site = site(vec!["/broken"]);
    site.broken.insert("/broken");
    site
}

#[test]
fn test_exit_status_success() {
    let h = Harness::new("[build]\nworkers = 3\n", site(vec!["/about", "/blog/post-1"]));
    assert_eq!(run_pipeline(h.pipeline()).unwrap(), 0);
}

#[test]
fn test_exit_status_page_error_reports_route() {
    let h = Harness::new("[build]\nworkers = 1\n", broken_site());
    assert_eq!(run_pipeline(h.pipeline()).unwrap(), EXIT_FAILURE);

    let lines = captured_lines();
    assert!(lines.iter().any(|l| l == "[error] /broken: cannot render"));
    assert!(lines.iter().any(|l| l.starts_with("[error] 1 page failed to render")));
}

#[test]
fn test_exit_status_discovery_error() {
    let site = FakeSite {
        discovery: Some(Err("no routes module")),
        ..Default::default()
    };
    let h = Harness::new("", site);
    assert_eq!(run_pipeline(h.pipeline()).unwrap(), EXIT_FAILURE);
    assert!(captured_lines().iter().any(|l| l.contains("no routes module")));
}

// ============================================================================
// Stage failures
// ============================================================================

#[tokio::test]
async fn test_bundle_failure_stops_later_stages() {
    let h = Harness::new("", site(vec!["/about"]));
    let toolchain = Arc::new(FakeToolchain {
        fail_bundle: true,
        ..FakeToolchain::new(&h.config)
    });
    let pipeline = Pipeline::new(
        Arc::clone(&h.config),
        toolchain.clone(),
        Arc::new(FakeFactory(Arc::clone(&h.site))),
        h.adapter.clone(),
    );

    let err = pipeline.run().await.unwrap_err();
    assert!(matches!(err, BuildError::ExternalTool { tool: "bundler", .. }));
    // The client compile was already in flight and finished.
    assert!(toolchain.called("compile client"));
    assert!(!toolchain.called("compile render"));
    assert!(h.site.rendered.lock().is_empty());
}

async fn render_compile_failure(review: Option<&'static str>) -> BuildError {
    let h = Harness::new("", site(vec!["/about"]));
    let toolchain = Arc::new(FakeToolchain {
        render_error: Some("-- SYNTAX PROBLEM -- src/Page.page"),
        review,
        ..FakeToolchain::new(&h.config)
    });
    let pipeline = Pipeline::new(
        Arc::clone(&h.config),
        toolchain.clone(),
        Arc::new(FakeFactory(Arc::clone(&h.site))),
        h.adapter.clone(),
    );
    let err = pipeline.run().await.unwrap_err();
    assert!(toolchain.called("review"));
    assert!(h.site.rendered.lock().is_empty());
    err
}

#[tokio::test]
async fn test_render_compile_failure_shows_review_report() {
    let err = render_compile_failure(Some(
        r#"{"errors":[{"path":"src/Page.page","errors":[{"rule":"NoMissingTypeAnnotation","message":"add an annotation"}]}]}"#,
    ))
    .await;
    assert!(matches!(err, BuildError::ExternalTool { tool: "review", ref message }
        if message.contains("NoMissingTypeAnnotation")));
}

#[tokio::test]
async fn test_render_compile_parse_error_shows_compiler_output() {
    let err = render_compile_failure(Some(
        r#"{"errors":[{"path":"src/Page.page","errors":[{"rule":"ParsingError","message":"x"}]}]}"#,
    ))
    .await;
    assert!(matches!(err, BuildError::ExternalTool { tool: "compiler", ref message }
        if message.contains("SYNTAX PROBLEM")));
}

#[tokio::test]
async fn test_render_compile_failure_without_review_tool() {
    let err = render_compile_failure(None).await;
    assert!(matches!(err, BuildError::ExternalTool { tool: "compiler", .. }));
}

#[tokio::test]
async fn test_template_without_placeholders_is_rejected() {
    let h = Harness::new("[build]\ntemplate = \"shell.html\"\n", site(vec![]));
    fs::write(
        h.config.get_root().join("shell.html"),
        r#"<html><head><script defer src="/main.js" type="text/javascript"></script></head></html>"#,
    )
    .unwrap();

    let err = h.run().await.unwrap_err();
    assert!(matches!(err, BuildError::ManifestTemplateMismatch { ref placeholder, .. }
        if placeholder == "<!-- PLACEHOLDER_PRELOADS -->"));
    assert!(h.site.rendered.lock().is_empty());
}

#[tokio::test]
async fn test_adapter_failure_fails_build() {
    let mut h = Harness::new("", site(vec!["/about"]));
    h.adapter = Arc::new(RecordingAdapter {
        fail: true,
        ..Default::default()
    });
    let err = h.run().await.unwrap_err();
    assert!(matches!(err, BuildError::Adapter(_)));
    // Pages were rendered before the handoff.
    assert!(h.dist().join("404.html").exists());
}

#[tokio::test]
async fn test_base_path_flows_into_template() {
    let h = Harness::new("[build]\nbase = \"docs\"\n", site(vec![]));
    let summary = h.run().await.unwrap();
    let template = fs::read_to_string(&summary.template).unwrap();
    assert!(template.contains(&format!(r#"href="/docs/{ENTRY_CHUNK}""#)));
}

#[tokio::test]
async fn test_clean_flag_removes_stale_output() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path(), "");
    config.build.clean = true;
    fs::create_dir_all(&config.build.output).unwrap();
    fs::write(config.build.output.join("stale.html"), "old").unwrap();

    let config = Arc::new(config);
    let pipeline = Pipeline::new(
        Arc::clone(&config),
        Arc::new(FakeToolchain::new(&config)),
        Arc::new(FakeFactory(Arc::new(site(vec![])))),
        Arc::new(RecordingAdapter::default()),
    );
    pipeline.run().await.unwrap();
    assert!(!config.build.output.join("stale.html").exists());
    assert!(config.build.output.join("404.html").exists());
}

#[test]
fn test_first_error_keeps_first() {
    let result = first_error([
        Ok(()),
        Err(BuildError::tool("compiler", "a")),
        Err(BuildError::tool("bundler", "b")),
    ]);
    assert!(matches!(result, Err(BuildError::ExternalTool { tool: "compiler", .. })));
    assert!(first_error([Ok(()), Ok(())]).is_ok());
}
