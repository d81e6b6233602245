//! Post-compile asset processing: fingerprinting, shell rewriting, minify.

mod fingerprint;
mod manifest;
pub mod minify;

pub use fingerprint::{AssetRecord, fingerprint_file};
pub use manifest::{
    PRELOAD_PLACEHOLDER, ShellRewrite, read_manifest, rewrite_manifest, script_tag,
};
