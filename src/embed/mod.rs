//! Embedded static resources.
//!
//! # Usage
//!
//! ```ignore
//! use embed::build::{SHELL_HTML, ShellVars};
//!
//! let shell = SHELL_HTML.render(&ShellVars { client_script: "main.js" });
//! ```

mod template;

pub use template::{Template, TemplateVars};

pub mod build {
    use super::{Template, TemplateVars};

    /// Variables for the default HTML shell.
    pub struct ShellVars<'a> {
        pub client_script: &'a str,
    }

    impl TemplateVars for ShellVars<'_> {
        fn apply(&self, content: &str) -> String {
            content.replace("__CLIENT_SCRIPT__", self.client_script)
        }
    }

    /// Default HTML shell, used as the bundler entry when the project does
    /// not provide `build.template`. Carries both rewrite markers.
    pub const SHELL_HTML: Template<ShellVars<'static>> =
        Template::new(include_str!("build/shell.html"));

    /// Serializer spliced into the render module: forces lazy virtual-DOM
    /// nodes before the page tree is handed back as JSON.
    pub const FORCE_THUNKS_JS: &str = include_str!("build/force_thunks.js");
}

#[cfg(test)]
mod tests {
    use super::build::*;
    use crate::asset::{PRELOAD_PLACEHOLDER, script_tag};

    #[test]
    fn test_default_shell_has_rewrite_markers() {
        let shell = SHELL_HTML.render(&ShellVars {
            client_script: "main.js",
        });
        assert!(shell.contains(PRELOAD_PLACEHOLDER));
        assert!(shell.contains(&script_tag("/main.js")));
        assert!(!shell.contains("__CLIENT_SCRIPT__"));
    }

    #[test]
    fn test_force_thunks_defines_serializer() {
        assert!(FORCE_THUNKS_JS.contains("function forceThunks(vNode)"));
        assert!(FORCE_THUNKS_JS.trim_end().ends_with("function _HtmlAsJson_toJson(html) {"));
    }
}
