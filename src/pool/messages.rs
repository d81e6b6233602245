//! Messages between the supervisor and its workers.
//!
//! ```text
//! Supervisor ──Job──► Worker (crossbeam channel, one per worker)
//! Worker ──WorkerEvent──► Supervisor (shared tokio mpsc inbox)
//! ```
//!
//! Dropping a worker's job sender terminates that worker.

use crate::core::RoutePath;
use crate::render::RenderRequest;

pub type WorkerId = usize;

#[derive(Debug, Clone)]
pub enum Job {
    /// Enumerate every route (sent to the discovery worker only).
    Discover,
    Render(RenderRequest),
}

#[derive(Debug)]
pub enum WorkerEvent {
    /// Backend loaded; ready for jobs.
    Online { worker: WorkerId },

    /// Discovery succeeded.
    AllPaths {
        worker: WorkerId,
        routes: Vec<RoutePath>,
    },

    /// Discovery answered with an error.
    DiscoveryFailed { worker: WorkerId, message: String },

    /// Page rendered and persisted.
    Done { worker: WorkerId, route: RoutePath },

    /// Page failed; the worker is still usable.
    Error {
        worker: WorkerId,
        route: RoutePath,
        message: String,
    },

    /// Worker died (spawn failure, protocol break, panic). It sends nothing
    /// after this.
    Fault {
        worker: WorkerId,
        route: Option<RoutePath>,
        message: String,
    },
}

impl WorkerEvent {
    pub fn worker(&self) -> WorkerId {
        match self {
            Self::Online { worker }
            | Self::AllPaths { worker, .. }
            | Self::DiscoveryFailed { worker, .. }
            | Self::Done { worker, .. }
            | Self::Error { worker, .. }
            | Self::Fault { worker, .. } => *worker,
        }
    }
}
