//! Dynamic worker pool rendering every discovered route.
//!
//! ```text
//!              spawn(n)
//! Orchestrator ────────► Pool ──► Supervisor task (owns queue + outcome)
//!      │                               ▲      │ Job
//!      │ discovered() / drained()      │      ▼
//!      └───────────────────────  WorkerEvent  Worker threads (1 backend each)
//! ```
//!
//! Worker 0 discovers routes; the queue is then populated once with the
//! not-found route plus every discovered route, and each worker pulls the
//! next route as soon as it finishes a job. Page failures never stop the
//! drain.

mod messages;
mod outcome;
mod queue;
mod supervisor;
mod worker;


pub use outcome::PoolReport;
pub use supervisor::{Pool, PoolOptions};
