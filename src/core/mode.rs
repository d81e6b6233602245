//! Build and render modes.

use serde::{Deserialize, Serialize};

/// Compiler mode for the page-description program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildMode {
    /// Compile with optimizations and run the optimizer pass.
    pub optimize: bool,

    /// Minify the compiled client script.
    pub minify: bool,
}

impl BuildMode {
    /// Production mode: optimized, minified output.
    pub const PRODUCTION: Self = Self {
        optimize: true,
        minify: true,
    };

    /// Debug mode: readable output with the compiler's debugger hooks.
    pub const DEBUG: Self = Self {
        optimize: false,
        minify: false,
    };

    pub const fn from_debug(debug: bool) -> Self {
        if debug { Self::DEBUG } else { Self::PRODUCTION }
    }

    #[inline]
    pub const fn is_debug(&self) -> bool {
        !self.optimize
    }

    /// Compiler flag for this mode.
    pub const fn compiler_flag(&self) -> &'static str {
        if self.optimize { "--optimize" } else { "--debug" }
    }
}

/// Mode flag carried by every render request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderMode {
    /// Static build: pages are written to the output tree.
    #[default]
    Build,
    /// Preview server rendering on demand.
    Preview,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_mode_flags() {
        assert_eq!(BuildMode::from_debug(true), BuildMode::DEBUG);
        assert!(BuildMode::DEBUG.is_debug());
        assert_eq!(BuildMode::PRODUCTION.compiler_flag(), "--optimize");
        assert_eq!(BuildMode::DEBUG.compiler_flag(), "--debug");
    }

    #[test]
    fn test_render_mode_wire_names() {
        assert_eq!(serde_json::to_string(&RenderMode::Build).unwrap(), r#""build""#);
        assert_eq!(serde_json::to_string(&RenderMode::Preview).unwrap(), r#""preview""#);
    }
}
