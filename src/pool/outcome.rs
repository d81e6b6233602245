//! Aggregate result of one pool run.

use crate::build::BuildError;

/// Mutated only by the supervisor loop.
#[derive(Debug)]
pub struct BuildOutcome {
    pub succeeded: bool,
    /// Render jobs that completed with `done` or `error`, plus jobs lost to
    /// a worker fault mid-render.
    pub rendered_count: usize,
    pub errors: Vec<BuildError>,
}

impl Default for BuildOutcome {
    fn default() -> Self {
        Self {
            succeeded: true,
            rendered_count: 0,
            errors: Vec::new(),
        }
    }
}

impl BuildOutcome {
    pub fn record_done(&mut self) {
        self.rendered_count += 1;
    }

    /// Record a failure; the outcome can never flip back to success.
    pub fn fail(&mut self, error: BuildError) {
        self.succeeded = false;
        self.errors.push(error);
    }

    /// Failed render jobs (page errors and faulted jobs).
    pub fn failed_pages(&self) -> usize {
        self.errors.iter().filter(|e| e.is_page_level()).count()
    }

    pub fn discovery_error(&self) -> Option<&BuildError> {
        self.errors
            .iter()
            .find(|e| matches!(e, BuildError::Discovery(_)))
    }
}

/// What the supervisor hands back once every worker has terminated.
#[derive(Debug)]
pub struct PoolReport {
    pub outcome: BuildOutcome,
    /// Routes still queued when the last worker terminated.
    pub pending: usize,
    /// Render jobs handed to workers (discovery excluded).
    pub dispatched: usize,
}
