use async_trait::async_trait;
use chrono::{DateTime, Utc};
use enact_manifest::{Action, Manifest};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// The structured error taxonomy every component ultimately reports
/// through. Providers populate this directly for their own failure
/// modes; `enact-core` maps typed errors from the other crates onto it
/// at the controller boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    ValidationError,
    TrustError,
    ContainerError,
    BuildError,
    CommandError,
    Timeout,
    AuthError,
    NetworkError,
}

/// Implements [`std::error::Error`] (via `thiserror`) so `enact-core`
/// can fold it into [`enact_core::CoreError`] with `#[error(transparent)]`,
/// even though a provider usually returns it as a value inside
/// [`ExecutionResult`] rather than propagating it with `?`.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[error("{code:?}: {message}")]
pub struct ExecutionError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ExecutionError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ExecutionError {
            code,
            message: message.into(),
            details: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionMetadata {
    pub tool_name: String,
    pub container_image: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_ms: u64,
    pub cached: bool,
    pub execution_id: String,
}

/// A non-fatal condition surfaced alongside a result, e.g. a yanked
/// version notice threaded through from the fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub code: String,
    pub message: String,
}

/// The full outcome of one provider invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub output: CommandOutput,
    pub metadata: ExecutionMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ExecutionError>,
    #[serde(default)]
    pub warnings: Vec<Warning>,
}

impl ExecutionResult {
    pub fn failure(
        tool_name: &str,
        execution_id: String,
        start_time: DateTime<Utc>,
        code: ErrorCode,
        message: impl Into<String>,
    ) -> Self {
        let end_time = Utc::now();
        ExecutionResult {
            success: false,
            output: CommandOutput::default(),
            metadata: ExecutionMetadata {
                tool_name: tool_name.to_string(),
                container_image: None,
                start_time,
                duration_ms: duration_ms(start_time, end_time),
                end_time,
                cached: false,
                execution_id,
            },
            error: Some(ExecutionError::new(code, message)),
            warnings: Vec::new(),
        }
    }
}

pub fn duration_ms(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    (end - start).num_milliseconds().max(0) as u64
}

/// Caller-supplied knobs threaded through to a provider. `cancellation`
/// carries the single token the pipeline races every suspension point
/// against.
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    pub timeout: Option<Duration>,
    pub workdir: Option<PathBuf>,
    pub mount_dirs: BTreeMap<PathBuf, PathBuf>,
    pub env_overrides: BTreeMap<String, String>,
    pub verbose: bool,
    pub cancellation: CancellationToken,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        ExecutionOptions {
            timeout: None,
            workdir: None,
            mount_dirs: BTreeMap::new(),
            env_overrides: BTreeMap::new(),
            verbose: false,
            cancellation: CancellationToken::new(),
        }
    }
}

/// Result of a provider health probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Unavailable(String),
}

/// The capability set shared by every execution backend. All methods
/// are idempotent; `initialize`/`shutdown` may be called more than
/// once safely.
#[async_trait]
pub trait ExecutionProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn initialize(&self) -> Result<(), ExecutionError>;

    async fn is_available(&self) -> bool;

    async fn health(&self) -> HealthStatus;

    /// Renders `manifest.command` against `input` and executes it.
    async fn execute(
        &self,
        manifest: &Manifest,
        input: &serde_json::Value,
        options: &ExecutionOptions,
    ) -> ExecutionResult;

    /// Executes an already-rendered command, bypassing template
    /// substitution (used for action argv forms built upstream).
    async fn exec(
        &self,
        manifest: &Manifest,
        raw_command: &enact_template::Command,
        options: &ExecutionOptions,
    ) -> ExecutionResult;

    /// Executes a named action within the skill.
    async fn execute_action(
        &self,
        manifest: &Manifest,
        action_name: &str,
        action: &Action,
        input: &serde_json::Value,
        options: &ExecutionOptions,
    ) -> ExecutionResult;

    async fn shutdown(&self) -> Result<(), ExecutionError>;
}
