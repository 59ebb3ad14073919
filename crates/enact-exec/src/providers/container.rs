//! Builds (if needed) and runs a container image for a skill, probing
//! for an installed runtime (docker/podman/nerdctl) and sharing its
//! spawn/capture/timeout mechanics with the local provider.
//!
//! Secret resolution happens once, upstream in the controller; this
//! provider only ever sees the already-merged env in
//! [`ExecutionOptions::env_overrides`] and re-emits it as `-e` flags.

use crate::contract::{
    duration_ms, CommandOutput, ErrorCode, ExecutionError, ExecutionMetadata, ExecutionOptions,
    ExecutionProvider, ExecutionResult,
};
use crate::providers::process::{run_managed, ProcessOutcome};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use enact_manifest::{Action, Manifest};
use enact_template::{Command as TemplateCommand, MissingParamPolicy, Param, TokenStyle};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tokio::process::Command;

/// Runtimes probed in order, matching docker's dominance in the
/// ecosystem while preferring whatever the caller explicitly asked for.
const CANDIDATE_RUNTIMES: &[&str] = &["docker", "podman", "nerdctl"];

const IMAGE_BUILD_TIMEOUT: Duration = Duration::from_secs(10 * 60);
const DEFAULT_BASE_IMAGE: &str = "alpine:3.19";

#[derive(Default)]
pub struct ContainerProvider {
    runtime_override: Option<String>,
    runtime: OnceLock<Option<String>>,
}

impl ContainerProvider {
    pub fn new() -> Self {
        ContainerProvider::default()
    }

    pub fn with_runtime(runtime: impl Into<String>) -> Self {
        ContainerProvider {
            runtime_override: Some(runtime.into()),
            runtime: OnceLock::new(),
        }
    }

    fn detected_runtime(&self) -> Option<&str> {
        self.runtime
            .get_or_init(|| self.runtime_override.clone().or_else(detect_runtime))
            .as_deref()
    }
}

#[async_trait]
impl ExecutionProvider for ContainerProvider {
    fn name(&self) -> &'static str {
        "container"
    }

    async fn initialize(&self) -> Result<(), ExecutionError> {
        self.detected_runtime();
        Ok(())
    }

    async fn is_available(&self) -> bool {
        self.detected_runtime().is_some()
    }

    async fn health(&self) -> crate::contract::HealthStatus {
        match self.detected_runtime() {
            Some(_) => crate::contract::HealthStatus::Healthy,
            None => crate::contract::HealthStatus::Unavailable(
                "no container runtime (docker/podman/nerdctl) found".to_string(),
            ),
        }
    }

    async fn execute(
        &self,
        manifest: &Manifest,
        input: &serde_json::Value,
        options: &ExecutionOptions,
    ) -> ExecutionResult {
        let start = Utc::now();
        let execution_id = uuid::Uuid::new_v4().to_string();

        let Some(template) = &manifest.command else {
            return ExecutionResult::failure(
                &manifest.name,
                execution_id,
                start,
                ErrorCode::CommandError,
                "manifest has no command to run",
            );
        };

        let params = json_to_params(input);
        let rendered = match enact_template::render(
            template,
            &params,
            TokenStyle::Both,
            MissingParamPolicy::Error,
        ) {
            Ok(c) => c,
            Err(e) => {
                return ExecutionResult::failure(
                    &manifest.name,
                    execution_id,
                    start,
                    ErrorCode::CommandError,
                    e.to_string(),
                )
            }
        };

        self.run_in_container(manifest, &rendered, input, options, start, execution_id)
            .await
    }

    async fn exec(
        &self,
        manifest: &Manifest,
        raw_command: &TemplateCommand,
        options: &ExecutionOptions,
    ) -> ExecutionResult {
        let start = Utc::now();
        let execution_id = uuid::Uuid::new_v4().to_string();
        self.run_in_container(
            manifest,
            raw_command,
            &serde_json::Value::Null,
            options,
            start,
            execution_id,
        )
        .await
    }

    async fn execute_action(
        &self,
        manifest: &Manifest,
        _action_name: &str,
        action: &Action,
        input: &serde_json::Value,
        options: &ExecutionOptions,
    ) -> ExecutionResult {
        let start = Utc::now();
        let execution_id = uuid::Uuid::new_v4().to_string();

        let params = json_to_params(input);
        let rendered = match enact_template::render(
            &action.command,
            &params,
            TokenStyle::Both,
            MissingParamPolicy::Error,
        ) {
            Ok(c) => c,
            Err(e) => {
                return ExecutionResult::failure(
                    &manifest.name,
                    execution_id,
                    start,
                    ErrorCode::CommandError,
                    e.to_string(),
                )
            }
        };

        self.run_in_container(manifest, &rendered, input, options, start, execution_id)
            .await
    }

    async fn shutdown(&self) -> Result<(), ExecutionError> {
        Ok(())
    }
}

impl ContainerProvider {
    async fn run_in_container(
        &self,
        manifest: &Manifest,
        rendered: &TemplateCommand,
        input: &serde_json::Value,
        options: &ExecutionOptions,
        start: DateTime<Utc>,
        execution_id: String,
    ) -> ExecutionResult {
        let Some(runtime) = self.detected_runtime() else {
            return ExecutionResult::failure(
                &manifest.name,
                execution_id,
                start,
                ErrorCode::ContainerError,
                "no container runtime available",
            );
        };
        let runtime = runtime.to_string();

        let Some(source_dir) = &options.workdir else {
            return ExecutionResult::failure(
                &manifest.name,
                execution_id,
                start,
                ErrorCode::ContainerError,
                "no resolved source directory to mount",
            );
        };

        let image = match resolve_image(&runtime, manifest, source_dir).await {
            Ok(image) => image,
            Err(message) => {
                return ExecutionResult::failure(
                    &manifest.name,
                    execution_id,
                    start,
                    ErrorCode::ContainerError,
                    message,
                )
            }
        };

        // Parameters are already baked into `rendered` by template
        // substitution; mirroring them as env vars lets a `sh -c`
        // command reference `$param` directly too.
        let mut env_vars: BTreeMap<String, String> = BTreeMap::new();
        if let Some(object) = input.as_object() {
            for (key, value) in object {
                env_vars.insert(key.clone(), json_value_to_env_string(value));
            }
        }
        env_vars.extend(options.env_overrides.clone());

        let argv = build_run_argv(source_dir, &image, &env_vars, rendered);
        let mut command = Command::new(&runtime);
        command.args(&argv);

        match run_managed(command, options.timeout, &options.cancellation).await {
            Ok(output) => build_result(manifest, execution_id, start, image, output),
            Err(e) => ExecutionResult::failure(
                &manifest.name,
                execution_id,
                start,
                ErrorCode::ContainerError,
                format!("failed to spawn {runtime}: {e}"),
            ),
        }
    }
}

fn build_result(
    manifest: &Manifest,
    execution_id: String,
    start: DateTime<Utc>,
    image: String,
    managed: crate::providers::process::ManagedOutput,
) -> ExecutionResult {
    let end = Utc::now();
    let (success, error) = match managed.outcome {
        ProcessOutcome::Exited(Some(0)) => (true, None),
        ProcessOutcome::Exited(code) => (
            false,
            Some(ExecutionError::new(
                ErrorCode::CommandError,
                format!("command exited with status {code:?}"),
            )),
        ),
        ProcessOutcome::TimedOut => (
            false,
            Some(ExecutionError::new(ErrorCode::Timeout, "execution timed out")),
        ),
        ProcessOutcome::Cancelled => (
            false,
            Some(ExecutionError::new(
                ErrorCode::CommandError,
                "execution was cancelled",
            )),
        ),
    };
    let exit_code = match managed.outcome {
        ProcessOutcome::Exited(code) => code,
        _ => None,
    };

    ExecutionResult {
        success,
        output: CommandOutput {
            stdout: managed.stdout,
            stderr: managed.stderr,
            exit_code,
        },
        metadata: ExecutionMetadata {
            tool_name: manifest.name.clone(),
            container_image: Some(image),
            start_time: start,
            end_time: end,
            duration_ms: duration_ms(start, end),
            cached: false,
            execution_id,
        },
        error,
        warnings: Vec::new(),
    }
}

/// Probes `CANDIDATE_RUNTIMES` in order, returning the first whose
/// `--version` invocation succeeds.
fn detect_runtime() -> Option<String> {
    CANDIDATE_RUNTIMES
        .iter()
        .find(|candidate| {
            std::process::Command::new(candidate)
                .arg("--version")
                .stdout(std::process::Stdio::null())
                .stderr(std::process::Stdio::null())
                .status()
                .map(|status| status.success())
                .unwrap_or(false)
        })
        .map(|s| s.to_string())
}

/// Locates a `Containerfile` or `Dockerfile` in the skill's source
/// directory, preferring the former (the OCI-neutral name).
fn find_container_recipe(source_dir: &Path) -> Option<PathBuf> {
    for name in ["Containerfile", "Dockerfile"] {
        let candidate = source_dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

/// `enact-<12 hex chars of sha256(name|source_dir)>`.
fn compute_image_tag(name: &str, source_dir: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(b"|");
    hasher.update(source_dir.to_string_lossy().as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("enact-{}", &digest[..12])
}

async fn resolve_image(
    runtime: &str,
    manifest: &Manifest,
    source_dir: &Path,
) -> Result<String, String> {
    match find_container_recipe(source_dir) {
        Some(recipe) => {
            let tag = compute_image_tag(&manifest.name, source_dir);
            let mut command = Command::new(runtime);
            command
                .arg("build")
                .arg("-t")
                .arg(&tag)
                .arg("-f")
                .arg(&recipe)
                .arg(source_dir);
            let output = run_managed(
                command,
                Some(IMAGE_BUILD_TIMEOUT),
                &tokio_util::sync::CancellationToken::new(),
            )
            .await
            .map_err(|e| format!("failed to spawn {runtime} build: {e}"))?;
            match output.outcome {
                ProcessOutcome::Exited(Some(0)) => Ok(tag),
                other => Err(format!(
                    "image build failed ({other:?}): {}",
                    output.stderr
                )),
            }
        }
        None => Ok(manifest
            .from
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_IMAGE.to_string())),
    }
}

/// `run --rm -w /workspace -v <host>:/workspace -e K=V ... <image>
/// <argv or "sh -c <command>">`.
fn build_run_argv(
    source_dir: &Path,
    image: &str,
    env_vars: &BTreeMap<String, String>,
    rendered: &TemplateCommand,
) -> Vec<String> {
    let mut argv = vec![
        "run".to_string(),
        "--rm".to_string(),
        "-w".to_string(),
        "/workspace".to_string(),
        "-v".to_string(),
        format!("{}:/workspace", source_dir.display()),
    ];
    for (key, value) in env_vars {
        argv.push("-e".to_string());
        argv.push(format!("{key}={value}"));
    }
    argv.push(image.to_string());
    argv.extend(rendered.argv().iter().cloned());
    argv
}

fn json_value_to_env_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_to_params(input: &serde_json::Value) -> BTreeMap<String, Param> {
    input
        .as_object()
        .map(|map| map.iter().map(|(k, v)| (k.clone(), Param::from(v))).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_tag_is_deterministic_and_well_formed() {
        let dir = Path::new("/tmp/acme-lint");
        let tag_a = compute_image_tag("acme/lint", dir);
        let tag_b = compute_image_tag("acme/lint", dir);
        assert_eq!(tag_a, tag_b);
        assert!(tag_a.starts_with("enact-"));
        assert_eq!(tag_a.len(), "enact-".len() + 12);
    }

    #[test]
    fn image_tag_differs_by_name_or_directory() {
        let dir = Path::new("/tmp/acme-lint");
        let other_dir = Path::new("/tmp/acme-format");
        assert_ne!(
            compute_image_tag("acme/lint", dir),
            compute_image_tag("acme/format", dir)
        );
        assert_ne!(
            compute_image_tag("acme/lint", dir),
            compute_image_tag("acme/lint", other_dir)
        );
    }

    #[test]
    fn finds_containerfile_before_dockerfile() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Dockerfile"), "FROM scratch\n").unwrap();
        std::fs::write(dir.path().join("Containerfile"), "FROM scratch\n").unwrap();
        let found = find_container_recipe(dir.path()).unwrap();
        assert_eq!(found.file_name().unwrap(), "Containerfile");
    }

    #[test]
    fn no_recipe_present_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_container_recipe(dir.path()).is_none());
    }

    #[test]
    fn run_argv_wraps_shell_form_commands() {
        let env = BTreeMap::from([("NAME".to_string(), "world".to_string())]);
        let rendered = TemplateCommand::Shell(vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo $NAME; true".to_string(),
        ]);
        let argv = build_run_argv(Path::new("/src"), "alpine:3.19", &env, &rendered);
        assert!(argv.contains(&"-e".to_string()));
        assert!(argv.contains(&"NAME=world".to_string()));
        assert_eq!(argv[argv.len() - 3], "sh");
        assert_eq!(argv[argv.len() - 2], "-c");
    }

    #[test]
    fn run_argv_passes_argv_form_directly() {
        let env = BTreeMap::new();
        let rendered = TemplateCommand::Argv(vec!["echo".to_string(), "hi".to_string()]);
        let argv = build_run_argv(Path::new("/src"), "alpine:3.19", &env, &rendered);
        assert_eq!(argv[argv.len() - 2], "echo");
        assert_eq!(argv[argv.len() - 1], "hi");
    }

    #[test]
    fn an_unreachable_fake_runtime_is_never_detected() {
        assert!(!std::process::Command::new("enact-definitely-not-a-real-binary")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false));
    }
}
