//! The execution controller: ties the resolver, fetcher, trust
//! verifier, secret broker, schema validator, and execution router
//! together into a single pipeline — resolve, fetch, verify, validate,
//! execute, report.

pub mod config;
pub mod controller;
pub mod dry_run;
pub mod errors;
mod input;

pub use config::{EnvOverrides, ExecutionConfig};
pub use controller::{looks_like_registry_tool, ExecutionController, RunOutcome, RunRequest};
pub use dry_run::DryRunPreview;
pub use errors::{CoreError, CoreResult};
