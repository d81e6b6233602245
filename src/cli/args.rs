//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Pagesmith static site build orchestrator
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: pagesmith.toml)
    #[arg(short = 'C', long, default_value = "pagesmith.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build the site: compile, bundle, render every page, run the adapter
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        build_args: BuildArgs,
    },
}

/// Build command arguments
#[derive(clap::Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Clean output directory completely before building
    #[arg(short, long)]
    pub clean: bool,

    /// Debug build: no optimizer, no minifier
    #[arg(short, long)]
    pub debug: bool,

    /// Output directory path (relative to project root)
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub output: Option<PathBuf>,

    /// URL base path the site is served from (e.g. /docs/)
    #[arg(short, long)]
    pub base: Option<String>,

    /// Override site URL; its path component becomes the base path.
    ///
    /// Example: deploying to a GitHub Pages project site:
    ///   pagesmith build --site-url "https://example.github.io/docs"
    #[arg(short = 'U', long = "site-url", value_hint = clap::ValueHint::Url)]
    pub site_url: Option<String>,

    /// Number of render workers (default: available cores - 1)
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long)]
    pub verbose: bool,

    /// Hide the page progress line
    #[arg(short, long)]
    pub quiet: bool,
}
