//! Configuration types shared across sections.

mod error;
mod handle;
mod paths;

pub use error::{ConfigDiagnostics, ConfigError};
pub use handle::{cfg, init_config};
pub use paths::PathResolver;
