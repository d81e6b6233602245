//! Source-text patches applied to compiled program output.
//!
//! The page-description compiler leaves two marker calls in its output that
//! only make sense once the target platform is known:
//!
//! - `return f('REPLACE_ME_WITH_FORM_TO_STRING')` becomes browser form
//!   serialization (client and render module).
//! - `return f('REPLACE_ME_WITH_JSON_STRINGIFY')` becomes the virtual-DOM
//!   serializer (render module only).
//!
//! Both have a debug and an optimized variant: debug output wraps values in
//! the runtime's JSON boxes, optimized output uses raw JS values.

use std::sync::LazyLock;

use regex::{NoExpand, Regex};

use crate::core::BuildMode;
use crate::embed::build::FORCE_THUNKS_JS;

static FORM_TO_STRING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"return [A-Za-z0-9_$]+\(.REPLACE_ME_WITH_FORM_TO_STRING.\)").unwrap()
});

static JSON_STRINGIFY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"return [A-Za-z0-9_$]+\(.REPLACE_ME_WITH_JSON_STRINGIFY.\)").unwrap()
});

const APPEND_SUBMITTER: &str = "function appendSubmitter (myFormData, event) { event.submitter && event.submitter.name && event.submitter.name.length > 0 ? myFormData.append(event.submitter.name, event.submitter.value) : myFormData;  return myFormData }; return ";

const FORM_DEBUG: &str = "_Json_wrap(Array.from(appendSubmitter(new FormData(_Json_unwrap(event).target), _Json_unwrap(event))))";

const FORM_OPTIMIZED: &str = "Array.from(new FormData(event.target))";

const APP_DYING: &str = "console.log('App dying')";

/// Form serialization replacement for `mode`.
pub fn form_serializer(mode: BuildMode) -> String {
    let value = if mode.is_debug() { FORM_DEBUG } else { FORM_OPTIMIZED };
    format!("{APPEND_SUBMITTER}{value}")
}

/// Virtual-DOM serializer replacement for `mode`.
pub fn json_serializer(mode: BuildMode) -> String {
    if mode.is_debug() {
        format!("return {FORCE_THUNKS_JS}\n  return _Json_wrap(forceThunks(html));\n")
    } else {
        format!("return {FORCE_THUNKS_JS}\nreturn forceThunks(html);\n")
    }
}

/// Patch every form serialization marker. Output without markers is
/// returned unchanged.
pub fn patch_form_serialization(source: &str, mode: BuildMode) -> String {
    let replacement = form_serializer(mode);
    FORM_TO_STRING
        .replace_all(source, NoExpand(&replacement))
        .into_owned()
}

/// Patch the render module: JSON marker, then the shutdown log line.
pub fn patch_render_module(source: &str, mode: BuildMode) -> String {
    let replacement = json_serializer(mode);
    JSON_STRINGIFY
        .replace_all(source, NoExpand(&replacement))
        .replacen(APP_DYING, "", 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORM_SITE: &str =
        "var f = function (event) { return $elm$json$Json$Encode$string('REPLACE_ME_WITH_FORM_TO_STRING'); };";

    #[test]
    fn test_form_patch_optimized() {
        let out = patch_form_serialization(FORM_SITE, BuildMode::PRODUCTION);
        assert_eq!(
            out,
            "var f = function (event) { function appendSubmitter (myFormData, event) { event.submitter && event.submitter.name && event.submitter.name.length > 0 ? myFormData.append(event.submitter.name, event.submitter.value) : myFormData;  return myFormData }; return Array.from(new FormData(event.target)); };"
        );
    }

    #[test]
    fn test_form_patch_debug() {
        let out = patch_form_serialization(FORM_SITE, BuildMode::DEBUG);
        assert!(out.ends_with(
            "return _Json_wrap(Array.from(appendSubmitter(new FormData(_Json_unwrap(event).target), _Json_unwrap(event)))); };"
        ));
        assert!(!out.contains("REPLACE_ME"));
    }

    #[test]
    fn test_form_patch_replaces_every_marker() {
        let source = format!("{FORM_SITE}\n{FORM_SITE}");
        let out = patch_form_serialization(&source, BuildMode::PRODUCTION);
        assert_eq!(out.matches("appendSubmitter (myFormData").count(), 2);
    }

    #[test]
    fn test_form_patch_accepts_double_quotes() {
        let source = r#"return A2("REPLACE_ME_WITH_FORM_TO_STRING")"#;
        let out = patch_form_serialization(source, BuildMode::PRODUCTION);
        assert!(out.ends_with("return Array.from(new FormData(event.target))"));
    }

    #[test]
    fn test_unmarked_source_is_untouched() {
        let source = "return $elm$json$Json$Encode$string('hello')";
        assert_eq!(patch_form_serialization(source, BuildMode::DEBUG), source);
    }

    #[test]
    fn test_render_module_patch() {
        let source = "function x(html) { return $elm$json$Json$Encode$string('REPLACE_ME_WITH_JSON_STRINGIFY') }\nconsole.log('App dying');";
        let out = patch_render_module(source, BuildMode::PRODUCTION);
        assert!(out.starts_with("function x(html) { return  _HtmlAsJson_toJson(x)\n}"));
        assert!(out.contains("function forceThunks(vNode)"));
        // `$` in the serializer must survive verbatim.
        assert!(out.contains("vNode.$ === \"#2\""));
        assert!(out.contains("function _HtmlAsJson_toJson(html) {\n\nreturn forceThunks(html);\n }"));
        assert!(!out.contains("App dying"));
        assert!(out.ends_with(";"));
    }

    #[test]
    fn test_render_module_patch_debug() {
        let source = "return F('REPLACE_ME_WITH_JSON_STRINGIFY')";
        let out = patch_render_module(source, BuildMode::DEBUG);
        assert!(out.ends_with("  return _Json_wrap(forceThunks(html));\n"));
    }
}
