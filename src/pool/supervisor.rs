//! Pool supervisor: owns the workers, the page queue and the outcome.
//!
//! # State per worker
//!
//! ```text
//! Spawning ──► Online ──► AwaitingDiscovery ──┐
//!                 │                           ▼
//!                 └────────► Idle ◄─────► Busy ──► Terminated
//!                                  (fault) └──────────┘
//! ```
//!
//! The supervisor is one async task draining one inbox, so its state needs
//! no locks even though every worker reports concurrently. It never polls:
//! each worker event advances exactly that worker.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam::channel::{self, Sender};
use tokio::sync::{mpsc, oneshot};

use super::messages::{Job, WorkerEvent, WorkerId};
use super::outcome::{BuildOutcome, PoolReport};
use super::queue::{PageQueue, page_set};
use super::worker::{WorkerContext, spawn_worker};
use crate::build::BuildError;
use crate::core::{RenderMode, RoutePath};
use crate::logger::ProgressLine;
use crate::render::{BackendFactory, Bootstrap, RenderRequest};
use crate::utils::plural_count;
use crate::{debug, log};

/// Settings for one pool run.
#[derive(Debug, Clone)]
pub struct PoolOptions {
    pub workers: usize,
    pub bootstrap: Bootstrap,
    pub output_dir: PathBuf,
    pub mode: RenderMode,
    pub ports: Option<PathBuf>,
    /// Liveness timeout while jobs are in flight.
    pub timeout: Option<Duration>,
    pub progress: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Spawning,
    Online,
    AwaitingDiscovery,
    Idle,
    Busy,
    Terminated,
}

struct Slot {
    state: WorkerState,
    jobs: Option<Sender<Job>>,
    /// Route in flight (`None` while discovering or idle).
    current: Option<RoutePath>,
    thread: Option<JoinHandle<()>>,
}

/// Handle to a running pool.
pub struct Pool {
    discovery: oneshot::Receiver<Result<usize, String>>,
    completion: tokio::task::JoinHandle<PoolReport>,
}

impl Pool {
    /// Spawn `options.workers` render workers (at least one) and start the
    /// supervisor. Worker 0 performs discovery.
    ///
    /// Must be called inside a tokio runtime.
    pub fn spawn(options: PoolOptions, factory: Arc<dyn BackendFactory>) -> std::io::Result<Self> {
        let count = options.workers.max(1);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (discovery_tx, discovery_rx) = oneshot::channel();

        let mut slots = Vec::with_capacity(count);
        for id in 0..count {
            let (jobs_tx, jobs_rx) = channel::unbounded();
            let ctx = WorkerContext {
                id,
                bootstrap: options.bootstrap.clone(),
                output_dir: options.output_dir.clone(),
                factory: Arc::clone(&factory),
            };
            // On error the already-spawned workers see their channel close
            // when `slots` drops, and exit.
            let thread = spawn_worker(ctx, jobs_rx, events_tx.clone())?;
            slots.push(Slot {
                state: WorkerState::Spawning,
                jobs: Some(jobs_tx),
                current: None,
                thread: Some(thread),
            });
        }
        drop(events_tx);

        log!("pool"; "rendering with {}", plural_count(count, "worker thread"));

        let supervisor = Supervisor {
            active: slots.len(),
            slots,
            queue: PageQueue::new(),
            outcome: BuildOutcome::default(),
            discovery_tx: Some(discovery_tx),
            dispatched: 0,
            progress: None,
            options,
        };
        let completion = tokio::spawn(supervisor.run(events_rx));

        Ok(Self {
            discovery: discovery_rx,
            completion,
        })
    }

    /// Resolves with the number of queued pages once discovery finished,
    /// or the discovery diagnostic when it failed.
    pub async fn discovered(&mut self) -> Result<usize, String> {
        (&mut self.discovery)
            .await
            .unwrap_or_else(|_| Err("discovery never completed".into()))
    }

    /// Wait until every worker has terminated.
    pub async fn drained(self) -> PoolReport {
        match self.completion.await {
            Ok(report) => report,
            Err(err) => {
                let mut outcome = BuildOutcome::default();
                outcome.fail(BuildError::WorkerFault {
                    worker: 0,
                    route: None,
                    message: format!("pool supervisor stopped: {err}"),
                });
                PoolReport {
                    outcome,
                    pending: 0,
                    dispatched: 0,
                }
            }
        }
    }
}

struct Supervisor {
    slots: Vec<Slot>,
    active: usize,
    queue: PageQueue,
    outcome: BuildOutcome,
    discovery_tx: Option<oneshot::Sender<Result<usize, String>>>,
    dispatched: usize,
    progress: Option<ProgressLine>,
    options: PoolOptions,
}

const DISCOVERY_WORKER: WorkerId = 0;

impl Supervisor {
    async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<WorkerEvent>) -> PoolReport {
        while self.active > 0 {
            let event = match self.next_event(&mut inbox).await {
                Next::Event(event) => event,
                Next::TimedOut => {
                    self.fault_busy("no progress within the worker timeout");
                    continue;
                }
                Next::Closed => {
                    self.fault_all("worker exited without reporting");
                    break;
                }
            };
            self.handle(event);
        }

        self.finish().await
    }

    async fn next_event(&self, inbox: &mut mpsc::UnboundedReceiver<WorkerEvent>) -> Next {
        let any_busy = self.slots.iter().any(|s| s.state == WorkerState::Busy);
        let received = match self.options.timeout {
            Some(limit) if any_busy => match tokio::time::timeout(limit, inbox.recv()).await {
                Ok(received) => received,
                Err(_) => return Next::TimedOut,
            },
            _ => inbox.recv().await,
        };
        received.map_or(Next::Closed, Next::Event)
    }

    fn handle(&mut self, event: WorkerEvent) {
        let worker = event.worker();
        // Late events from a slot already retired (timeout) are dropped.
        if self.slots[worker].state == WorkerState::Terminated {
            debug!("pool"; "ignoring event from retired worker {}", worker);
            return;
        }

        match event {
            WorkerEvent::Online { worker } => self.on_online(worker),
            WorkerEvent::AllPaths { worker, routes } => {
                self.publish(Ok(routes));
                self.dispatch_next(worker);
            }
            WorkerEvent::DiscoveryFailed { worker, message } => {
                self.publish(Err(message));
                self.dispatch_next(worker);
            }
            WorkerEvent::Done { worker, route } => {
                debug!("render"; "{}", route);
                self.complete_job(worker);
                self.dispatch_next(worker);
            }
            WorkerEvent::Error { worker, route, message } => {
                log!("error"; "{}: {}", route, message);
                self.complete_job(worker);
                self.outcome.fail(BuildError::PageRender { route, message });
                self.dispatch_next(worker);
            }
            WorkerEvent::Fault { worker, message, .. } => self.fault(worker, &message),
        }
    }

    fn on_online(&mut self, worker: WorkerId) {
        self.slots[worker].state = WorkerState::Online;
        if worker == DISCOVERY_WORKER {
            debug!("pool"; "worker {} discovering routes", worker);
            self.send(worker, Job::Discover);
        } else if self.queue.is_populated() {
            self.dispatch_next(worker);
        } else {
            self.slots[worker].state = WorkerState::AwaitingDiscovery;
        }
    }

    /// Populate the queue (empty on failure), settle the discovery future and
    /// wake every worker that was waiting for the page list.
    fn publish(&mut self, discovery: Result<Vec<RoutePath>, String>) {
        let settled = match discovery {
            Ok(routes) => {
                let pages = page_set(routes);
                let count = pages.len();
                self.queue.populate(pages);
                if self.options.progress {
                    self.progress = ProgressLine::new("render", &[("pages", count)]);
                }
                Ok(count)
            }
            Err(message) => {
                log!("error"; "route discovery failed: {}", message);
                self.queue.populate(std::iter::empty());
                self.outcome.fail(BuildError::Discovery(message.clone()));
                Err(message)
            }
        };
        if let Some(tx) = self.discovery_tx.take() {
            let _ = tx.send(settled);
        }

        let waiting: Vec<_> = (0..self.slots.len())
            .filter(|&id| self.slots[id].state == WorkerState::AwaitingDiscovery)
            .collect();
        for id in waiting {
            self.dispatch_next(id);
        }
    }

    fn complete_job(&mut self, worker: WorkerId) {
        self.slots[worker].current = None;
        self.outcome.record_done();
        if let Some(progress) = &self.progress {
            progress.inc("pages");
        }
    }

    /// Hand the next route to `worker`, or terminate it when none remains.
    fn dispatch_next(&mut self, worker: WorkerId) {
        self.slots[worker].state = WorkerState::Idle;
        match self.queue.pop() {
            Some(route) => {
                let request = RenderRequest {
                    route: route.clone(),
                    mode: self.options.mode,
                    ports: self.options.ports.clone(),
                };
                self.slots[worker].current = Some(route);
                self.dispatched += 1;
                self.send(worker, Job::Render(request));
            }
            None => self.terminate(worker),
        }
    }

    fn send(&mut self, worker: WorkerId, job: Job) {
        let slot = &mut self.slots[worker];
        slot.state = WorkerState::Busy;
        let sent = slot.jobs.as_ref().is_some_and(|tx| tx.send(job).is_ok());
        if !sent {
            self.fault(worker, "job channel closed");
        }
    }

    fn terminate(&mut self, worker: WorkerId) {
        let slot = &mut self.slots[worker];
        if slot.state == WorkerState::Terminated {
            return;
        }
        slot.state = WorkerState::Terminated;
        slot.jobs = None;
        self.active -= 1;
        debug!("pool"; "worker {} terminated, {} active", worker, self.active);
    }

    /// Retire a worker slot after an unrecoverable failure.
    ///
    /// A job lost mid-render counts as rendered (and failed). A discovery
    /// worker lost before answering fails discovery.
    fn fault(&mut self, worker: WorkerId, message: &str) {
        let route = self.slots[worker].current.take();
        log!("error"; "render worker {} faulted: {}", worker, message);

        if route.is_some() {
            self.outcome.record_done();
            if let Some(progress) = &self.progress {
                progress.inc("pages");
            }
        }
        self.outcome.fail(BuildError::WorkerFault {
            worker,
            route,
            message: message.to_string(),
        });
        self.terminate(worker);

        if worker == DISCOVERY_WORKER && self.discovery_tx.is_some() {
            self.publish(Err(format!("discovery worker faulted: {message}")));
        }
    }

    fn fault_busy(&mut self, message: &str) {
        let busy: Vec<_> = (0..self.slots.len())
            .filter(|&id| self.slots[id].state == WorkerState::Busy)
            .collect();
        for id in busy {
            // A stuck thread cannot be joined; let it go.
            self.slots[id].thread = None;
            self.fault(id, message);
        }
    }

    fn fault_all(&mut self, message: &str) {
        let live: Vec<_> = (0..self.slots.len())
            .filter(|&id| self.slots[id].state != WorkerState::Terminated)
            .collect();
        for id in live {
            self.fault(id, message);
        }
    }

    async fn finish(mut self) -> PoolReport {
        if let Some(progress) = self.progress.take() {
            progress.finish();
        }
        if let Some(tx) = self.discovery_tx.take() {
            let message = String::from("every render worker terminated before discovery");
            self.outcome.fail(BuildError::Discovery(message.clone()));
            let _ = tx.send(Err(message));
        }

        let threads: Vec<_> = self.slots.iter_mut().filter_map(|s| s.thread.take()).collect();
        let _ = tokio::task::spawn_blocking(move || {
            for thread in threads {
                let _ = thread.join();
            }
        })
        .await;

        PoolReport {
            pending: self.queue.len(),
            dispatched: self.dispatched,
            outcome: self.outcome,
        }
    }
}

enum Next {
    Event(WorkerEvent),
    TimedOut,
    Closed,
}
