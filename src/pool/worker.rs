//! Render worker: one OS thread owning one render backend.
//!
//! The thread loads its backend, announces itself, then runs jobs strictly
//! one at a time until its job channel closes. Backend calls and page writes
//! run under `catch_unwind` so a panic becomes a `Fault` event instead of a
//! silent hang of the supervisor.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::Receiver;
use tokio::sync::mpsc::UnboundedSender;

use super::messages::{Job, WorkerEvent, WorkerId};
use crate::debug;
use crate::render::{BackendFactory, Bootstrap, RenderBackend, RenderError, write_page};

/// Everything a worker thread needs, moved into the thread.
pub struct WorkerContext {
    pub id: WorkerId,
    pub bootstrap: Bootstrap,
    pub output_dir: PathBuf,
    pub factory: Arc<dyn BackendFactory>,
}

pub fn spawn_worker(
    ctx: WorkerContext,
    jobs: Receiver<Job>,
    events: UnboundedSender<WorkerEvent>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("render-{}", ctx.id))
        .spawn(move || run(ctx, jobs, events))
}

fn run(ctx: WorkerContext, jobs: Receiver<Job>, events: UnboundedSender<WorkerEvent>) {
    let id = ctx.id;

    let spawned = panic::catch_unwind(AssertUnwindSafe(|| ctx.factory.spawn(&ctx.bootstrap)))
        .unwrap_or_else(|payload| Err(RenderError::Fault(panic_message(payload))));
    let mut backend = match spawned {
        Ok(backend) => backend,
        Err(err) => {
            let _ = events.send(WorkerEvent::Fault {
                worker: id,
                route: None,
                message: err.to_string(),
            });
            return;
        }
    };

    if events.send(WorkerEvent::Online { worker: id }).is_err() {
        return;
    }

    for job in jobs.iter() {
        let event = execute(&ctx, backend.as_mut(), job);
        let fatal = matches!(event, WorkerEvent::Fault { .. });
        if events.send(event).is_err() || fatal {
            break;
        }
    }

    debug!("pool"; "worker {} exiting", id);
}

fn execute(ctx: &WorkerContext, backend: &mut dyn RenderBackend, job: Job) -> WorkerEvent {
    let worker = ctx.id;
    match job {
        Job::Discover => {
            let result = panic::catch_unwind(AssertUnwindSafe(|| backend.all_paths()))
                .unwrap_or_else(|payload| Err(RenderError::Fault(panic_message(payload))));
            match result {
                Ok(routes) => WorkerEvent::AllPaths { worker, routes },
                Err(RenderError::Page(message)) => WorkerEvent::DiscoveryFailed { worker, message },
                Err(RenderError::Fault(message)) => WorkerEvent::Fault {
                    worker,
                    route: None,
                    message,
                },
            }
        }
        Job::Render(request) => {
            let route = request.route.clone();
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                backend
                    .render(&request)
                    .map(|payload| write_page(&ctx.output_dir, &request.route, &payload))
            }))
            .unwrap_or_else(|payload| Err(RenderError::Fault(panic_message(payload))));

            match result {
                Ok(Ok(_)) => WorkerEvent::Done { worker, route },
                Ok(Err(err)) => WorkerEvent::Error {
                    worker,
                    route,
                    message: format!("{err:#}"),
                },
                Err(RenderError::Page(message)) => WorkerEvent::Error {
                    worker,
                    route,
                    message,
                },
                Err(RenderError::Fault(message)) => WorkerEvent::Fault {
                    worker,
                    route: Some(route),
                    message,
                },
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .map_or_else(|| "worker panicked".into(), |msg| format!("worker panicked: {msg}"))
}
