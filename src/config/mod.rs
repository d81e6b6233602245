//! Site configuration management for `pagesmith.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # [build] [toolchain] [render] [adapter]
//! ├── types/         # ConfigError, ConfigDiagnostics, PathResolver
//! ├── util.rs        # config discovery, URL helpers
//! └── mod.rs         # SiteConfig (this file)
//! ```

pub mod section;
pub mod types;
mod util;

use util::{extract_url_path, find_config_file};

pub use section::{AdapterConfig, BuildSectionConfig, RenderConfig, ToolchainConfig};
pub use types::{ConfigDiagnostics, ConfigError, PathResolver, cfg, init_config};

use crate::{
    cli::{BuildArgs, Cli, Commands},
    log,
    utils::fs::normalize_path,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing pagesmith.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Build settings
    pub build: BuildSectionConfig,

    /// External tools
    pub toolchain: ToolchainConfig,

    /// Render runtime
    pub render: RenderConfig,

    /// Deployment adapter
    pub adapter: AdapterConfig,
}

impl SiteConfig {
    /// Load configuration from CLI arguments.
    ///
    /// Searches upward from cwd for the config file; the project root is the
    /// config file's parent directory.
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = find_config_file(&cli.config)
            .ok_or_else(|| ConfigError::NotFound(cli.config.clone()))?;

        let mut config = Self::from_path(&config_path)?;
        config.config_path = normalize_path(&config_path);

        let root = config
            .config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        match &cli.command {
            Commands::Build { build_args } => config.apply_build_args(build_args),
        }
        config.finalize(&root);
        config.validate()?;

        Ok(config)
    }

    /// Resolve paths and derived values once all overrides are applied.
    pub fn finalize(&mut self, root: &Path) {
        let root = normalize_path(root);
        self.set_root(&root);

        self.build.output = normalize_path(&root.join(&self.build.output));
        self.build.work_dir = normalize_path(&root.join(&self.build.work_dir));
        self.build.client_entry = root.join(&self.build.client_entry);
        self.build.render_entry = root.join(&self.build.render_entry);
        self.build.ports_entry = root.join(&self.build.ports_entry);
        if let Some(template) = self.build.template.take() {
            self.build.template = Some(root.join(template));
        }

        self.sync_base_from_url();
        self.build.normalize_base();
    }

    /// Derive `base` from `site_url` when one is configured.
    fn sync_base_from_url(&mut self) {
        if let Some(ref url) = self.build.site_url
            && let Some(path) = extract_url_path(url)
        {
            self.build.base = path;
        }
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {} are ignored:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        &self.root
    }

    /// Set the root directory path
    pub fn set_root(&mut self, path: &Path) {
        self.root = path.to_path_buf();
    }

    /// Get path resolver for the work/output tree.
    pub fn paths(&self) -> PathResolver<'_> {
        PathResolver::new(
            &self.root,
            &self.build.output,
            &self.build.work_dir,
            &self.build.client_script,
            &self.toolchain.manifest,
        )
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Apply build arguments from CLI.
    fn apply_build_args(&mut self, args: &BuildArgs) {
        crate::logger::set_verbose(args.verbose);

        Self::update_option(&mut self.build.output, args.output.as_ref());
        Self::update_option(&mut self.build.base, args.base.as_ref());
        if args.site_url.is_some() {
            self.build.site_url = args.site_url.clone();
        }
        if args.workers.is_some() {
            self.build.workers = args.workers;
        }
        self.build.debug |= args.debug;
        self.build.clean = args.clean;
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate configuration, collecting all errors at once.
    pub fn validate(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();

        self.build.validate(&mut diag);
        self.toolchain.validate(&mut diag);
        self.render.validate(&mut diag);

        if self.build.output == self.root {
            diag.error("build.output", "must not be the project root");
        }

        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }
}

// ============================================================================
// Test Helpers
// ============================================================================

/// Parse a config rooted at `root`, panicking on unknown fields.
#[cfg(test)]
pub fn test_config(root: &Path, extra: &str) -> SiteConfig {
    let (mut parsed, ignored) = SiteConfig::parse_with_ignored(extra).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed.config_path = root.join("pagesmith.toml");
    parsed.finalize(root);
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_invalid_toml() {
        assert!(SiteConfig::from_str("[build\noutput = \"dist\"").is_err());
    }

    #[test]
    fn test_site_config_default() {
        let config = SiteConfig::default();
        assert_eq!(config.build.output, PathBuf::from("dist"));
        assert_eq!(config.build.base, "/");
        assert!(!config.build.debug);
        assert!(!config.adapter.is_configured());
        assert!(config.toolchain.compiler.is_empty());
    }

    #[test]
    fn test_unknown_fields_detected() {
        let content = "[build]\noutput = \"public\"\n[unknown_section]\nfield = \"value\"";
        let (config, ignored) = SiteConfig::parse_with_ignored(content).unwrap();
        assert_eq!(config.build.output, PathBuf::from("public"));
        assert!(ignored.iter().any(|f| f.contains("unknown_section")));
    }

    #[test]
    fn test_finalize_resolves_paths_and_base() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = test_config(
            dir.path(),
            "[build]\nsite_url = \"https://example.github.io/docs\"\n",
        );
        let root = config.get_root().to_path_buf();
        assert_eq!(config.build.output, root.join("dist"));
        assert_eq!(config.build.work_dir, root.join(".pagesmith"));
        assert_eq!(config.build.base, "/docs/");
    }

    #[test]
    fn test_validate_requires_compiler() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = test_config(dir.path(), "");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("toolchain.compiler"));

        let config = test_config(dir.path(), "[toolchain]\ncompiler = [\"pagec\", \"make\"]\n");
        assert!(config.validate().is_ok());
    }
}
