//! Core types - pure abstractions shared across the codebase.

mod mode;
mod route;

pub use mode::{BuildMode, RenderMode};
pub use route::{DATA_FILE, NOT_FOUND_ROUTE, PAGE_FILE, RoutePath};
