//! Render backend hosted in a child process.
//!
//! The render module is run by a configured runtime (`node render.js` by
//! default). Each Worker owns one child; requests and responses are single
//! JSON lines over its stdin/stdout. The child's stderr is inherited so page
//! diagnostics reach the terminal unchanged.

use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use rustc_hash::FxHashMap;

use super::{
    BackendFactory, Bootstrap, PagePayload, RenderBackend, RenderError, RenderRequest, Request,
    Response,
};
use crate::core::RoutePath;
use crate::debug;

/// Spawns one render process per Worker.
#[derive(Debug, Clone)]
pub struct ProcessBackendFactory {
    command: Vec<String>,
    cwd: PathBuf,
    envs: FxHashMap<String, String>,
}

impl ProcessBackendFactory {
    /// `command` is already variable-resolved.
    pub fn new(command: Vec<String>, cwd: PathBuf, envs: FxHashMap<String, String>) -> Self {
        Self { command, cwd, envs }
    }
}

impl BackendFactory for ProcessBackendFactory {
    fn spawn(&self, bootstrap: &Bootstrap) -> Result<Box<dyn RenderBackend>, RenderError> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| RenderError::Fault("empty render command".into()))?;

        let mut child = Command::new(program)
            .args(args)
            .current_dir(&self.cwd)
            .envs(&self.envs)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| RenderError::Fault(format!("failed to spawn `{program}`: {e}")))?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let (Some(stdin), Some(stdout)) = (stdin, stdout) else {
            let _ = child.kill();
            return Err(RenderError::Fault("render process has no stdio".into()));
        };

        debug!("render"; "spawned `{}` (pid {})", program, child.id());

        let mut backend = ProcessBackend {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            line: String::new(),
        };
        backend.send(bootstrap)?;
        Ok(Box::new(backend))
    }
}

struct ProcessBackend {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    line: String,
}

impl ProcessBackend {
    fn send<T: serde::Serialize>(&mut self, message: &T) -> Result<(), RenderError> {
        let mut line = serde_json::to_vec(message).map_err(|e| RenderError::Fault(e.to_string()))?;
        line.push(b'\n');
        self.stdin
            .write_all(&line)
            .and_then(|()| self.stdin.flush())
            .map_err(|e| RenderError::Fault(format!("render process stdin closed: {e}")))
    }

    fn receive(&mut self) -> Result<Response, RenderError> {
        loop {
            self.line.clear();
            let read = self
                .stdout
                .read_line(&mut self.line)
                .map_err(|e| RenderError::Fault(format!("failed to read render output: {e}")))?;
            if read == 0 {
                let status = self
                    .child
                    .try_wait()
                    .ok()
                    .flatten()
                    .map_or_else(|| "stdout closed".to_string(), |s| s.to_string());
                return Err(RenderError::Fault(format!("render process exited ({status})")));
            }
            let line = self.line.trim();
            if line.is_empty() {
                continue;
            }
            return serde_json::from_str(line).map_err(|e| {
                RenderError::Fault(format!("unexpected render output `{line}`: {e}"))
            });
        }
    }

    fn call(&mut self, request: &Request) -> Result<Response, RenderError> {
        self.send(request)?;
        self.receive()
    }
}

impl RenderBackend for ProcessBackend {
    fn all_paths(&mut self) -> Result<Vec<RoutePath>, RenderError> {
        match self.call(&Request::all_paths())? {
            Response::AllPaths(data) => serde_json::from_str(&data)
                .map_err(|e| RenderError::Page(format!("invalid route list: {e}"))),
            Response::Error(message) => Err(RenderError::Page(message)),
            Response::Done(_) => Err(RenderError::Fault(
                "expected `all-paths`, got `done`".into(),
            )),
        }
    }

    fn render(&mut self, request: &RenderRequest) -> Result<PagePayload, RenderError> {
        match self.call(&Request::render(request))? {
            Response::Done(payload) => Ok(payload),
            Response::Error(message) => Err(RenderError::Page(message)),
            Response::AllPaths(_) => Err(RenderError::Fault(
                "expected `done` or `error`, got `all-paths`".into(),
            )),
        }
    }
}

impl Drop for ProcessBackend {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
