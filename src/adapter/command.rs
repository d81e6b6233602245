//! Adapter run as an external command, input on stdin.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use super::{Adapter, AdapterInput};
use crate::build::BuildError;
use crate::log;
use crate::utils::exec::{Cmd, strip_ansi};
use crate::utils::vars::resolve_args;

pub struct CommandAdapter {
    command: Vec<String>,
    cwd: PathBuf,
    envs: FxHashMap<String, String>,
}

impl CommandAdapter {
    pub fn new(command: &[String], cwd: &Path, vars: &FxHashMap<String, String>) -> Self {
        Self {
            command: resolve_args(command, vars),
            cwd: cwd.to_path_buf(),
            envs: vars.clone(),
        }
    }
}

impl Adapter for CommandAdapter {
    fn run(&self, input: &AdapterInput) -> Result<(), BuildError> {
        let json = serde_json::to_vec(input).map_err(|e| BuildError::Adapter(e.to_string()))?;

        let output = Cmd::from_slice(&self.command)
            .cwd(&self.cwd)
            .envs(&self.envs)
            .stdin(json)
            .run_unchecked()
            .map_err(|e| BuildError::Adapter(format!("{e:#}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            log!("error"; "adapter script failed");
            return Err(BuildError::Adapter(failure_message(
                &output.status.to_string(),
                stdout.trim(),
                stderr.trim(),
            )));
        }

        for line in stdout.lines().chain(stderr.lines()) {
            let line = strip_ansi(line);
            if !line.trim().is_empty() {
                log!("adapter"; "{}", line);
            }
        }
        log!("adapter"; "adapter script complete");
        Ok(())
    }
}

/// Structured (JSON) adapter errors are pretty-printed; anything else is
/// shown as text.
fn failure_message(status: &str, stdout: &str, stderr: &str) -> String {
    let mut message = format!("exited with {status}");
    for stream in [stderr, stdout] {
        if stream.is_empty() {
            continue;
        }
        message.push('\n');
        match serde_json::from_str::<serde_json::Value>(stream) {
            Ok(value) => message.push_str(
                &serde_json::to_string_pretty(&value).unwrap_or_else(|_| stream.to_string()),
            ),
            Err(_) => message.push_str(&strip_ansi(stream)),
        }
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn input() -> AdapterInput {
        AdapterInput {
            render_function_file_path: "/w/render.js".into(),
            route_patterns: json!(["/"]),
            api_route_patterns: json!([]),
            ports_file_path: None,
            html_template: "<html></html>".into(),
        }
    }

    fn adapter(script: &str, dir: &Path) -> CommandAdapter {
        let command = vec!["sh".into(), "-c".into(), script.into()];
        CommandAdapter::new(&command, dir, &FxHashMap::default())
    }

    #[test]
    fn test_adapter_receives_input_on_stdin() {
        let dir = TempDir::new().unwrap();
        adapter("cat > adapter-input.json", dir.path()).run(&input()).unwrap();

        let written = std::fs::read_to_string(dir.path().join("adapter-input.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value["renderFunctionFilePath"], "/w/render.js");
        assert_eq!(value["htmlTemplate"], "<html></html>");
    }

    #[test]
    fn test_adapter_failure_prints_json() {
        let dir = TempDir::new().unwrap();
        let err = adapter(r#"cat > /dev/null; echo '{"reason":"quota"}' >&2; exit 1"#, dir.path())
            .run(&input())
            .unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("adapter failed:\nexited with"));
        assert!(message.contains("\"reason\": \"quota\""));
    }

    #[test]
    fn test_failure_message_plain_text() {
        let message = failure_message("exit status: 2", "", "boom");
        assert_eq!(message, "exited with exit status: 2\nboom");
    }
}
