//! `--dry-run` preview: reports what would run without running it.

use serde::Serialize;

/// What the controller would have done, surfaced instead of an
/// [`enact_exec::ExecutionResult`] when the caller requested a dry run.
/// Environment *keys* are reported, never the resolved values — a dry
/// run must not leak secret contents.
#[derive(Debug, Clone, Serialize)]
pub struct DryRunPreview {
    pub tool_name: String,
    pub provider: String,
    pub command: Vec<String>,
    pub env_keys: Vec<String>,
}
