//! Configuration section definitions.
//!
//! | Section       | Purpose                                         |
//! |---------------|-------------------------------------------------|
//! | `[build]`     | Paths, base, worker pool, debug mode            |
//! | `[toolchain]` | Compiler, optimizer, review, bundler, ports     |
//! | `[render]`    | Render runtime hosted by each worker            |
//! | `[adapter]`   | Deployment handoff command                      |

mod adapter;
pub mod build;
mod render;
mod toolchain;

pub use adapter::AdapterConfig;
pub use build::BuildSectionConfig;
pub use render::RenderConfig;
pub use toolchain::ToolchainConfig;
