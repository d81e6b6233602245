//! Pagesmith - build orchestrator for statically rendered sites.

mod adapter;
mod asset;
mod build;
mod cli;
mod config;
mod core;
mod embed;
mod logger;
mod pool;
mod render;
mod toolchain;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands, build::run_build};
use config::{SiteConfig, init_config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    init_config(SiteConfig::load(&cli)?);

    match &cli.command {
        Commands::Build { build_args } => {
            let status = run_build(build_args.quiet)?;
            if status != 0 {
                std::process::exit(status);
            }
        }
    }
    Ok(())
}
