//! JSON diagnostics emitted by the compiler (`--report json`) and the
//! review tool.
//!
//! Both tools describe a message as a list of segments, either plain text or
//! styled objects (`{"string": "...", "bold": true, "color": "red"}`).
//! Segments are joined back into plain text; colors are dropped.

use serde::Deserialize;
use serde_json::Value;

/// Rule name the review tool uses when it could not parse a module.
pub const PARSING_ERROR_RULE: &str = "ParsingError";

/// Review tool output: `{"errors": [{"path": ..., "errors": [{"rule": ...}]}]}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewReport {
    #[serde(default)]
    pub errors: Vec<ReviewFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewFile {
    pub path: String,
    #[serde(default)]
    pub errors: Vec<ReviewError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewError {
    pub rule: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub formatted: Vec<Value>,
}

impl ReviewReport {
    pub fn parse(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// A parse error makes the raw compiler output the better diagnostic.
    pub fn is_parsing_error(&self) -> bool {
        self.errors
            .iter()
            .flat_map(|file| &file.errors)
            .any(|error| error.rule == PARSING_ERROR_RULE)
    }

    /// Plain-text rendering, one block per finding.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for file in &self.errors {
            for error in &file.errors {
                let body = if error.formatted.is_empty() {
                    error.message.clone()
                } else {
                    join_segments(&error.formatted)
                };
                out.push_str(&format!("-- {} -- {}\n\n{}\n\n", error.rule, file.path, body.trim_end()));
            }
        }
        out.trim_end().to_string()
    }
}

/// Render a compiler JSON report as plain text, or `None` if `raw` is not one.
///
/// Handles both report shapes: a single `error` with a `message`, and
/// `compile-errors` with per-file `problems`.
pub fn render_compiler_report(raw: &str) -> Option<String> {
    let report: Value = serde_json::from_str(raw.trim()).ok()?;
    let mut out = String::new();

    match report.get("type")?.as_str()? {
        "error" => {
            let title = report.get("title").and_then(Value::as_str).unwrap_or("ERROR");
            let message = report.get("message").map(segments).unwrap_or_default();
            out.push_str(&format!("-- {title}\n\n{message}"));
        }
        "compile-errors" => {
            for file in report.get("errors")?.as_array()? {
                let path = file.get("path").and_then(Value::as_str).unwrap_or("");
                for problem in file.get("problems").and_then(Value::as_array).into_iter().flatten() {
                    let title = problem.get("title").and_then(Value::as_str).unwrap_or("ERROR");
                    let message = problem.get("message").map(segments).unwrap_or_default();
                    out.push_str(&format!("-- {title} -- {path}\n\n{}\n\n", message.trim_end()));
                }
            }
        }
        _ => return None,
    }
    Some(out.trim_end().to_string())
}

fn segments(value: &Value) -> String {
    match value {
        Value::Array(items) => join_segments(items),
        other => segment(other),
    }
}

fn join_segments(items: &[Value]) -> String {
    items.iter().map(segment).collect()
}

fn segment(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Object(styled) => styled
            .get("string")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}
