//! `pagesmith build` entry point.

use anyhow::{Context, Result};

use crate::build::Pipeline;
use crate::config::cfg;
use crate::log;

/// Process exit status of a failed build.
pub const EXIT_FAILURE: i32 = 1;

/// Build the site with the configured tools and return the exit status.
pub fn run_build(quiet: bool) -> Result<i32> {
    match Pipeline::from_config(cfg()) {
        Ok(pipeline) => run_pipeline(pipeline.with_progress(!quiet)),
        Err(e) => {
            log!("error"; "{}", e);
            Ok(EXIT_FAILURE)
        }
    }
}

/// Run `pipeline` on a fresh runtime. A failed build is logged and mapped
/// to [`EXIT_FAILURE`]; `Err` is reserved for the runtime itself.
pub fn run_pipeline(pipeline: Pipeline) -> Result<i32> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    match rt.block_on(pipeline.run()) {
        Ok(_) => Ok(0),
        Err(e) => {
            log!("error"; "{}", e);
            Ok(EXIT_FAILURE)
        }
    }
}
