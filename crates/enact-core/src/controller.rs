//! The execution controller: resolve, fetch, verify/gate, validate,
//! prepare, route, execute, report.

use crate::dry_run::DryRunPreview;
use crate::errors::{CoreError, CoreResult};
use crate::input;
use chrono::Utc;
use enact_exec::{
    CommandOutput, ErrorCode, ExecutionMetadata, ExecutionOptions, ExecutionResult, ExecutionRouter,
    RouterHints, Warning as ExecWarning,
};
use enact_fetcher::{FetchOptions, RegistryClient};
use enact_manifest::{Action, Manifest};
use enact_resolver::{Origin, ResolverError, Specifier, ToolResolution};
use enact_secrets::SecretBroker;
use enact_store::Layout;
use enact_template::{MissingParamPolicy, Param, TokenStyle};
use enact_trust::{TrustConfig, Verifier};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// A default execution budget when neither the invocation nor the
/// manifest names one.
const DEFAULT_EXECUTION_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// One invocation of the controller pipeline. Construct with
/// [`RunRequest::new`] and set the optional fields that apply.
pub struct RunRequest<'a> {
    pub specifier: &'a str,
    pub project_root: Option<&'a Path>,
    pub input_file: Option<&'a Path>,
    pub args_json: Option<&'a str>,
    pub input_kv: &'a [String],
    pub timeout: Option<Duration>,
    pub force_local: bool,
    pub force_remote: bool,
    pub local_only: bool,
    pub dry_run: bool,
    pub acknowledge_yanked: bool,
    pub verbose: bool,
    pub cancellation: CancellationToken,
}

impl<'a> RunRequest<'a> {
    pub fn new(specifier: &'a str) -> Self {
        RunRequest {
            specifier,
            project_root: None,
            input_file: None,
            args_json: None,
            input_kv: &[],
            timeout: None,
            force_local: false,
            force_remote: false,
            local_only: false,
            dry_run: false,
            acknowledge_yanked: false,
            verbose: false,
            cancellation: CancellationToken::new(),
        }
    }
}

/// What the controller produced: either a real execution, or — when
/// [`RunRequest::dry_run`] was set — a preview of what would have run.
#[derive(Debug)]
pub enum RunOutcome {
    Executed(ExecutionResult),
    DryRun(DryRunPreview),
}

/// Orchestrates one invocation end to end. Holds the long-lived pieces
/// (layout, router, secret broker, trust policy, optional registry
/// client) that are assembled once per process and shared across
/// concurrent requests — no mutable state beyond what's already on
/// disk.
pub struct ExecutionController {
    layout: Layout,
    router: ExecutionRouter,
    secrets: SecretBroker,
    trust_config: TrustConfig,
    registry: Option<Arc<dyn RegistryClient>>,
    fallback_registry: Option<Arc<dyn RegistryClient>>,
    verifier: Option<Verifier>,
}

impl ExecutionController {
    pub fn new(layout: Layout, router: ExecutionRouter, trust_config: TrustConfig) -> Self {
        ExecutionController {
            layout,
            router,
            secrets: SecretBroker::new("enact"),
            trust_config,
            registry: None,
            fallback_registry: None,
            verifier: None,
        }
    }

    /// Wires in the registry client + verifier needed to fetch
    /// not-yet-cached tools. Without this, resolution failures for
    /// registry-shaped specifiers surface as [`CoreError::NoRegistryConfigured`].
    pub fn with_registry(mut self, registry: Arc<dyn RegistryClient>, verifier: Verifier) -> Self {
        self.registry = Some(registry);
        self.verifier = Some(verifier);
        self
    }

    /// Wires in a fallback registry endpoint, retried once when the
    /// primary registry fails with a network/IO error (never for trust
    /// failures, which are fatal and never retried).
    pub fn with_fallback_registry(mut self, fallback: Arc<dyn RegistryClient>) -> Self {
        self.fallback_registry = Some(fallback);
        self
    }

    pub async fn run(&self, req: RunRequest<'_>) -> CoreResult<RunOutcome> {
        let start = Utc::now();
        debug!(specifier = req.specifier, "resolving");

        let mut fetch_warnings = Vec::new();
        let resolution = match enact_resolver::resolve(req.specifier, req.project_root, &self.layout) {
            Ok(resolution) => resolution,
            Err(ResolverError::NotFound { specifier, .. })
                if !req.local_only && looks_like_registry_tool(&specifier) =>
            {
                info!(specifier = %specifier, "resolution miss, falling back to a registry fetch");
                let outcome = self
                    .fetch(req.specifier, req.project_root, req.acknowledge_yanked)
                    .await?;
                fetch_warnings = outcome.warnings;
                enact_resolver::resolve(req.specifier, req.project_root, &self.layout)?
            }
            Err(e) => return Err(CoreError::Resolver(e)),
        };

        let tool_name = resolution.manifest.name.clone();
        let action_name = resolution.action.clone();
        let action = match &action_name {
            Some(name) => Some(resolution.manifest.action(name).ok_or_else(|| {
                CoreError::ActionNotFound {
                    tool: tool_name.clone(),
                    action: name.clone(),
                }
            })?),
            None => None,
        };

        let raw_input = input::parse_inputs(req.input_file, req.args_json, req.input_kv)?;
        let schema = action
            .and_then(|a| a.input_schema.as_ref())
            .unwrap_or(&resolution.manifest.input_schema);
        let validation = enact_schema::validate(schema, &raw_input);

        let early = if !validation.valid {
            Some(validation_failure_result(&tool_name, start, &validation))
        } else if action.is_none() && resolution.manifest.is_instruction_tool() {
            Some(instruction_tool_result(&resolution, start))
        } else {
            None
        };

        if let Some(mut result) = early {
            result.warnings.extend(fetch_warnings.into_iter().map(convert_warning));
            return Ok(RunOutcome::Executed(result));
        }

        let input = validation.coerced_values.unwrap_or(raw_input);

        let timeout = req
            .timeout
            .or(resolution.manifest.parsed_timeout()?)
            .or(Some(DEFAULT_EXECUTION_TIMEOUT));

        let mut env_overrides = config_level_env(&resolution.manifest);
        let secret_names: Vec<String> = resolution
            .manifest
            .env
            .iter()
            .filter(|(_, spec)| spec.secret)
            .map(|(name, _)| name.clone())
            .collect();
        env_overrides.extend(self.secrets.resolve(&tool_name, &secret_names));

        let options = ExecutionOptions {
            timeout,
            workdir: Some(resolution.source_dir.clone()),
            mount_dirs: BTreeMap::new(),
            env_overrides,
            verbose: req.verbose,
            cancellation: req.cancellation.clone(),
        };

        let hints = RouterHints {
            force_local: req.force_local,
            force_remote: req.force_remote,
        };
        let provider = self.router.select(&tool_name, hints).await?;
        info!(tool = %tool_name, provider = provider.name(), "routed");

        if req.dry_run {
            let command = render_preview_command(&resolution.manifest, action, &input)?;
            return Ok(RunOutcome::DryRun(DryRunPreview {
                tool_name,
                provider: provider.name().to_string(),
                command,
                env_keys: options.env_overrides.keys().cloned().collect(),
            }));
        }

        let mut result = match (action_name.as_deref(), action) {
            (Some(name), Some(action)) => {
                provider
                    .execute_action(&resolution.manifest, name, action, &input, &options)
                    .await
            }
            _ => provider.execute(&resolution.manifest, &input, &options).await,
        };
        result.warnings.extend(fetch_warnings.into_iter().map(convert_warning));
        Ok(RunOutcome::Executed(result))
    }

    /// The `install` CLI surface: fetches and caches a registry tool
    /// without resolving an execution path or running anything.
    /// Shares the same atomic fetch pipeline `run` falls back to on a
    /// resolution miss.
    pub async fn install(
        &self,
        raw_specifier: &str,
        project_root: Option<&Path>,
        acknowledge_yanked: bool,
    ) -> CoreResult<enact_fetcher::FetchOutcome> {
        self.fetch(raw_specifier, project_root, acknowledge_yanked).await
    }

    async fn fetch(
        &self,
        raw_specifier: &str,
        project_root: Option<&Path>,
        acknowledge_yanked: bool,
    ) -> CoreResult<enact_fetcher::FetchOutcome> {
        let (name, version) = match enact_resolver::parse_specifier(raw_specifier) {
            Specifier::Name { name, version, .. } => (name, version),
            _ => return Err(CoreError::NotFetchable(raw_specifier.to_string())),
        };

        let registry = self
            .registry
            .as_ref()
            .ok_or_else(|| CoreError::NoRegistryConfigured(name.clone()))?;
        let verifier = self
            .verifier
            .as_ref()
            .ok_or_else(|| CoreError::NoRegistryConfigured(name.clone()))?;

        let registry_path = match project_root {
            Some(root) => enact_store::project_tools_json(root),
            None => self.layout.user_tools_json(),
        };
        let options = FetchOptions { acknowledge_yanked };

        let outcome = match enact_fetcher::fetch_bundle(
            registry.as_ref(),
            verifier,
            &self.trust_config,
            &self.layout,
            &registry_path,
            &name,
            version.as_deref(),
            &options,
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(first_err) if is_retryable(&first_err) => match &self.fallback_registry {
                Some(fallback) => enact_fetcher::fetch_bundle(
                    fallback.as_ref(),
                    verifier,
                    &self.trust_config,
                    &self.layout,
                    &registry_path,
                    &name,
                    version.as_deref(),
                    &options,
                )
                .await
                .map_err(CoreError::Fetch)?,
                None => return Err(CoreError::Fetch(first_err)),
            },
            Err(e) => return Err(CoreError::Fetch(e)),
        };

        Ok(outcome)
    }
}

/// Heuristic for "looks like a registry tool": contains `/`, no
/// leading `.` or `/`. Bare aliases (no slash) are never fetchable
/// directly since the registry is keyed by hierarchical name.
pub fn looks_like_registry_tool(specifier: &str) -> bool {
    specifier.contains('/') && !specifier.starts_with('.') && !specifier.starts_with('/')
}

/// Network/IO failures are retried once against a fallback endpoint;
/// trust failures are fatal and never retried.
fn is_retryable(err: &enact_fetcher::FetchError) -> bool {
    matches!(
        err,
        enact_fetcher::FetchError::Download(..)
            | enact_fetcher::FetchError::Io(..)
            | enact_fetcher::FetchError::Registry(_)
    )
}

fn config_level_env(manifest: &Manifest) -> BTreeMap<String, String> {
    manifest
        .env
        .iter()
        .filter_map(|(key, spec)| spec.default.clone().map(|default| (key.clone(), default)))
        .collect()
}

fn convert_warning(warning: enact_fetcher::Warning) -> ExecWarning {
    match warning {
        enact_fetcher::Warning::YankedVersion { name, version } => ExecWarning {
            code: "YANKED_VERSION".to_string(),
            message: format!("{name}@{version} has been yanked"),
        },
    }
}

fn validation_failure_result(
    tool_name: &str,
    start: chrono::DateTime<Utc>,
    outcome: &enact_schema::ValidationOutcome,
) -> ExecutionResult {
    let execution_id = uuid::Uuid::new_v4().to_string();
    let messages: Vec<String> = outcome
        .errors
        .iter()
        .map(|e| format!("{}: {}", e.path, e.message))
        .collect();
    ExecutionResult::failure(
        tool_name,
        execution_id,
        start,
        ErrorCode::ValidationError,
        format!("input validation failed: {}", messages.join("; ")),
    )
}

fn instruction_tool_result(resolution: &ToolResolution, start: chrono::DateTime<Utc>) -> ExecutionResult {
    let end = Utc::now();
    let execution_id = uuid::Uuid::new_v4().to_string();
    ExecutionResult {
        success: true,
        output: CommandOutput {
            stdout: resolution.manifest.doc.clone().unwrap_or_default(),
            stderr: String::new(),
            exit_code: Some(0),
        },
        metadata: ExecutionMetadata {
            tool_name: resolution.manifest.name.clone(),
            container_image: None,
            start_time: start,
            end_time: end,
            duration_ms: (end - start).num_milliseconds().max(0) as u64,
            cached: resolution.origin != Origin::File,
            execution_id,
        },
        error: None,
        warnings: Vec::new(),
    }
}

fn render_preview_command(
    manifest: &Manifest,
    action: Option<&Action>,
    input: &serde_json::Value,
) -> CoreResult<Vec<String>> {
    let template = match action {
        Some(action) => &action.command,
        None => manifest
            .command
            .as_ref()
            .expect("instruction tools never reach command rendering"),
    };
    let params = json_to_params(input);
    let rendered = enact_template::render(template, &params, TokenStyle::Both, MissingParamPolicy::Error)
        .map_err(|e| {
            CoreError::Execution(enact_exec::ExecutionError::new(
                ErrorCode::CommandError,
                e.to_string(),
            ))
        })?;
    Ok(rendered.argv().to_vec())
}

fn json_to_params(input: &serde_json::Value) -> BTreeMap<String, Param> {
    input
        .as_object()
        .map(|map| map.iter().map(|(k, v)| (k.clone(), Param::from(v))).collect())
        .unwrap_or_default()
}

/// Internal invariant violations (an action resolved by name but absent
/// from `manifest.actions`, for instance) panic, but every path
/// reachable from user input above returns a `CoreError` instead.
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_tool_heuristic_requires_a_slash_and_no_leading_dot_or_root() {
        assert!(looks_like_registry_tool("acme/lint"));
        assert!(!looks_like_registry_tool("lint"));
        assert!(!looks_like_registry_tool("./acme/lint"));
        assert!(!looks_like_registry_tool("/acme/lint"));
    }

    #[test]
    fn only_network_and_io_fetch_failures_are_retryable() {
        use enact_fetcher::FetchError;
        assert!(!is_retryable(&FetchError::TrustDenied {
            name: "x".to_string(),
            minimum: 1,
        }));
        assert!(!is_retryable(&FetchError::HashMismatch {
            expected: "a".to_string(),
            actual: "b".to_string(),
        }));
    }
}
