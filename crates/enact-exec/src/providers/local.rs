//! Spawns the interpolated command directly on the host, in the
//! resolved skill's source directory. Provides no isolation.

use crate::contract::{
    duration_ms, CommandOutput, ErrorCode, ExecutionMetadata, ExecutionOptions, ExecutionProvider,
    ExecutionResult,
};
use crate::providers::process::{run_managed, ProcessOutcome};
use async_trait::async_trait;
use chrono::Utc;
use enact_manifest::{Action, Manifest};
use enact_template::{Command as TemplateCommand, MissingParamPolicy, Param, TokenStyle};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::process::Command;

const BUILD_STEP_TIMEOUT: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Default)]
pub struct LocalProvider;

#[async_trait]
impl ExecutionProvider for LocalProvider {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn initialize(&self) -> Result<(), crate::contract::ExecutionError> {
        Ok(())
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn health(&self) -> crate::contract::HealthStatus {
        crate::contract::HealthStatus::Healthy
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

        if let Some(err) = run_build_hooks(manifest, options).await {
            return err.into_result(&manifest.name, execution_id, start);
        }

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

        self.run_rendered(manifest, &rendered, options, start, execution_id).await
    }

    async fn exec(
        &self,
        manifest: &Manifest,
        raw_command: &TemplateCommand,
        options: &ExecutionOptions,
    ) -> ExecutionResult {
        let start = Utc::now();
        let execution_id = uuid::Uuid::new_v4().to_string();
        self.run_rendered(manifest, raw_command, options, start, execution_id).await
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

        self.run_rendered(manifest, &rendered, options, start, execution_id).await
    }

    async fn shutdown(&self) -> Result<(), crate::contract::ExecutionError> {
        Ok(())
    }
}

impl LocalProvider {
    async fn run_rendered(
        &self,
        manifest: &Manifest,
        rendered: &TemplateCommand,
        options: &ExecutionOptions,
        start: chrono::DateTime<Utc>,
        execution_id: String,
    ) -> ExecutionResult {
        let argv = rendered.argv();
        let Some((program, args)) = argv.split_first() else {
            return ExecutionResult::failure(
                &manifest.name,
                execution_id,
                start,
                ErrorCode::CommandError,
                "rendered command is empty",
            );
        };

        let mut command = Command::new(program);
        command.args(args);
        if let Some(dir) = &options.workdir {
            command.current_dir(dir);
        }
        // `options.env_overrides` already carries the controller's
        // merged config-level env and resolved secrets.
        for (key, value) in &options.env_overrides {
            command.env(key, value);
        }

        match run_managed(command, options.timeout, &options.cancellation).await {
            Ok(output) => build_result(manifest, execution_id, start, output),
            Err(e) => ExecutionResult::failure(
                &manifest.name,
                execution_id,
                start,
                ErrorCode::CommandError,
                format!("failed to spawn command: {e}"),
            ),
        }
    }
}

fn build_result(
    manifest: &Manifest,
    execution_id: String,
    start: chrono::DateTime<Utc>,
    managed: crate::providers::process::ManagedOutput,
) -> ExecutionResult {
    let end = Utc::now();
    let (success, error) = match managed.outcome {
        ProcessOutcome::Exited(Some(0)) => (true, None),
        ProcessOutcome::Exited(code) => (
            false,
            Some(crate::contract::ExecutionError::new(
                ErrorCode::CommandError,
                format!("command exited with status {code:?}"),
            )),
        ),
        ProcessOutcome::TimedOut => (
            false,
            Some(crate::contract::ExecutionError::new(
                ErrorCode::Timeout,
                "execution timed out",
            )),
        ),
        ProcessOutcome::Cancelled => (
            false,
            Some(crate::contract::ExecutionError::new(
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
            container_image: None,
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

struct BuildFailure(String);

impl BuildFailure {
    fn into_result(
        self,
        tool_name: &str,
        execution_id: String,
        start: chrono::DateTime<Utc>,
    ) -> ExecutionResult {
        ExecutionResult::failure(tool_name, execution_id, start, ErrorCode::BuildError, self.0)
    }
}

async fn run_build_hooks(manifest: &Manifest, options: &ExecutionOptions) -> Option<BuildFailure> {
    for step in &manifest.build {
        let params = BTreeMap::new();
        let rendered = match enact_template::render(
            step,
            &params,
            TokenStyle::Both,
            MissingParamPolicy::LeaveIntact,
        ) {
            Ok(c) => c,
            Err(e) => return Some(BuildFailure(e.to_string())),
        };
        let argv = rendered.argv();
        let Some((program, args)) = argv.split_first() else {
            continue;
        };
        let mut command = Command::new(program);
        command.args(args);
        if let Some(dir) = &options.workdir {
            command.current_dir(dir);
        }
        match run_managed(command, Some(BUILD_STEP_TIMEOUT), &options.cancellation).await {
            Ok(output) => match output.outcome {
                ProcessOutcome::Exited(Some(0)) => continue,
                ProcessOutcome::Exited(code) => {
                    return Some(BuildFailure(format!(
                        "build step '{step}' exited with status {code:?}: {}",
                        output.stderr
                    )))
                }
                ProcessOutcome::TimedOut => {
                    return Some(BuildFailure(format!("build step '{step}' timed out")))
                }
                ProcessOutcome::Cancelled => {
                    return Some(BuildFailure(format!("build step '{step}' was cancelled")))
                }
            },
            Err(e) => return Some(BuildFailure(format!("failed to spawn build step '{step}': {e}"))),
        }
    }
    None
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
    use serde_json::json;

    fn manifest_with_command(command: &str) -> Manifest {
        Manifest {
            name: "acme/greet".to_string(),
            version: Some("1.0.0".to_string()),
            description: String::new(),
            from: None,
            command: Some(command.to_string()),
            timeout: None,
            env: Default::default(),
            input_schema: json!({"type": "object", "properties": {}}),
            output_schema: None,
            actions: Default::default(),
            build: Vec::new(),
            doc: None,
        }
    }

    #[tokio::test]
    async fn executes_a_simple_command_and_captures_stdout() {
        let manifest = manifest_with_command("echo hello ${name}");
        let provider = LocalProvider;
        let options = ExecutionOptions::default();
        let result = provider
            .execute(&manifest, &json!({"name": "world"}), &options)
            .await;
        assert!(result.success);
        assert_eq!(result.output.stdout.trim(), "hello world");
        assert_eq!(result.output.exit_code, Some(0));
        assert!(!result.metadata.cached);
    }

    #[tokio::test]
    async fn nonzero_exit_produces_command_error() {
        let manifest = manifest_with_command("sh -c 'exit 3'");
        let provider = LocalProvider;
        let options = ExecutionOptions::default();
        let result = provider.execute(&manifest, &json!({}), &options).await;
        assert!(!result.success);
        assert_eq!(result.error.unwrap().code, ErrorCode::CommandError);
    }

    #[tokio::test]
    async fn instruction_tool_has_no_command() {
        let mut manifest = manifest_with_command("echo x");
        manifest.command = None;
        let provider = LocalProvider;
        let options = ExecutionOptions::default();
        let result = provider.execute(&manifest, &json!({}), &options).await;
        assert!(!result.success);
        assert_eq!(result.error.unwrap().code, ErrorCode::CommandError);
    }

    #[tokio::test]
    async fn failing_build_hook_short_circuits_before_the_main_command() {
        let mut manifest = manifest_with_command("echo should-not-run");
        manifest.build = vec!["sh -c 'exit 1'".to_string()];
        let provider = LocalProvider;
        let options = ExecutionOptions::default();
        let result = provider.execute(&manifest, &json!({}), &options).await;
        assert!(!result.success);
        assert_eq!(result.error.unwrap().code, ErrorCode::BuildError);
        assert!(result.output.stdout.is_empty());
    }
}
