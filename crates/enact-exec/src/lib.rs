//! Execution backends — container, local process, remote HTTP — and
//! the router that selects among them.
//!
//! Every provider implements [`ExecutionProvider`], a single capability
//! trait: one `async_trait`, one set of methods, no per-backend special
//! casing above this crate.

pub mod contract;
pub mod providers;
pub mod router;

pub use contract::{
    CommandOutput, ErrorCode, ExecutionError, ExecutionMetadata, ExecutionOptions,
    ExecutionProvider, ExecutionResult, HealthStatus, Warning,
};
pub use providers::{ContainerProvider, LocalProvider, RemoteProvider};
pub use router::{ExecutionRouter, RouterConfig, RouterHints};
