//! Delegates execution to a remote HTTP execution endpoint: POSTs a
//! JSON execution request with an optional bearer auth header and
//! explicit timeout, and reads back a structured result.

use crate::contract::{
    duration_ms, CommandOutput, ErrorCode, ExecutionError, ExecutionMetadata, ExecutionOptions,
    ExecutionProvider, ExecutionResult, HealthStatus, Warning,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use enact_manifest::{Action, Manifest};
use enact_template::Command as TemplateCommand;
use serde::Serialize;
use std::time::Duration;

const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

pub struct RemoteProvider {
    endpoint: String,
    bearer_token: Option<String>,
    client: reqwest::Client,
}

impl RemoteProvider {
    pub fn new(endpoint: impl Into<String>, bearer_token: Option<String>) -> Self {
        RemoteProvider {
            endpoint: endpoint.into(),
            bearer_token,
            client: reqwest::Client::new(),
        }
    }

    fn execute_url(&self) -> String {
        format!("{}/execute", self.endpoint.trim_end_matches('/'))
    }

    fn health_url(&self) -> String {
        format!("{}/health", self.endpoint.trim_end_matches('/'))
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RemoteRequest<'a> {
    #[serde(rename = "type")]
    request_type: &'a str,
    manifest: &'a Manifest,
    input: &'a serde_json::Value,
    options: RemoteOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    action_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw_command: Option<&'a TemplateCommand>,
}

/// The wire-safe subset of [`ExecutionOptions`]: the cancellation
/// token and filesystem mounts are local-process concerns that have no
/// meaning across the wire.
#[derive(Debug, Serialize)]
struct RemoteOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout_ms: Option<u64>,
    verbose: bool,
}

impl From<&ExecutionOptions> for RemoteOptions {
    fn from(options: &ExecutionOptions) -> Self {
        RemoteOptions {
            timeout_ms: options.timeout.map(|d| d.as_millis() as u64),
            verbose: options.verbose,
        }
    }
}

#[async_trait]
impl ExecutionProvider for RemoteProvider {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn initialize(&self) -> Result<(), ExecutionError> {
        Ok(())
    }

    async fn is_available(&self) -> bool {
        matches!(self.health().await, HealthStatus::Healthy)
    }

    async fn health(&self) -> HealthStatus {
        let request = self.authorized(
            self.client
                .get(self.health_url())
                .timeout(DEFAULT_HEALTH_TIMEOUT),
        );
        match request.send().await {
            Ok(response) if response.status().is_success() => HealthStatus::Healthy,
            Ok(response) => HealthStatus::Unavailable(format!(
                "health probe returned {}",
                response.status()
            )),
            Err(e) => HealthStatus::Unavailable(e.to_string()),
        }
    }

    async fn execute(
        &self,
        manifest: &Manifest,
        input: &serde_json::Value,
        options: &ExecutionOptions,
    ) -> ExecutionResult {
        self.dispatch("execute", manifest, input, None, None, options).await
    }

    async fn exec(
        &self,
        manifest: &Manifest,
        raw_command: &TemplateCommand,
        options: &ExecutionOptions,
    ) -> ExecutionResult {
        self.dispatch(
            "exec",
            manifest,
            &serde_json::Value::Null,
            None,
            Some(raw_command),
            options,
        )
        .await
    }

    async fn execute_action(
        &self,
        manifest: &Manifest,
        action_name: &str,
        action: &Action,
        input: &serde_json::Value,
        options: &ExecutionOptions,
    ) -> ExecutionResult {
        if let Some(schema) = &action.input_schema {
            let outcome = enact_schema::validate(schema, input);
            if !outcome.valid {
                let execution_id = uuid::Uuid::new_v4().to_string();
                let messages: Vec<String> = outcome
                    .errors
                    .iter()
                    .map(|e| format!("{}: {}", e.path, e.message))
                    .collect();
                return ExecutionResult::failure(
                    &manifest.name,
                    execution_id,
                    Utc::now(),
                    ErrorCode::ValidationError,
                    format!(
                        "input validation failed before remote dispatch: {}",
                        messages.join("; ")
                    ),
                );
            }
        }
        self.dispatch("executeAction", manifest, input, Some(action_name), None, options)
            .await
    }

    async fn shutdown(&self) -> Result<(), ExecutionError> {
        Ok(())
    }
}

impl RemoteProvider {
    async fn dispatch(
        &self,
        request_type: &str,
        manifest: &Manifest,
        input: &serde_json::Value,
        action_name: Option<&str>,
        raw_command: Option<&TemplateCommand>,
        options: &ExecutionOptions,
    ) -> ExecutionResult {
        let start = Utc::now();
        let execution_id = uuid::Uuid::new_v4().to_string();

        let body = RemoteRequest {
            request_type,
            manifest,
            input,
            options: RemoteOptions::from(options),
            action_name,
            raw_command,
        };

        let request = self.authorized(self.client.post(self.execute_url()).json(&body));
        let request = match options.timeout {
            Some(timeout) => request.timeout(timeout),
            None => request,
        };

        let send_future = request.send();
        let response = tokio::select! {
            biased;
            _ = options.cancellation.cancelled() => {
                return timeout_result(manifest, execution_id, start, "execution was cancelled");
            }
            result = send_future => result,
        };

        let response = match response {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return timeout_result(manifest, execution_id, start, "remote execution timed out")
            }
            Err(e) => {
                return ExecutionResult::failure(
                    &manifest.name,
                    execution_id,
                    start,
                    ErrorCode::CommandError,
                    format!("remote request failed: {e}"),
                )
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let code = if status.as_u16() == 401 || status.as_u16() == 403 {
                ErrorCode::AuthError
            } else {
                ErrorCode::NetworkError
            };
            return ExecutionResult::failure(
                &manifest.name,
                execution_id,
                start,
                code,
                format!("remote execution endpoint returned {status}"),
            );
        }

        match response.json::<RemoteExecutionResponse>().await {
            Ok(parsed) => finalize(manifest, execution_id, start, parsed),
            Err(e) => ExecutionResult::failure(
                &manifest.name,
                execution_id,
                start,
                ErrorCode::NetworkError,
                format!("malformed response from remote execution endpoint: {e}"),
            ),
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct RemoteExecutionResponse {
    success: bool,
    #[serde(default)]
    output: CommandOutput,
    #[serde(default)]
    warnings: Vec<Warning>,
    #[serde(default)]
    error: Option<RemoteExecutionError>,
}

#[derive(Debug, serde::Deserialize)]
struct RemoteExecutionError {
    code: ErrorCode,
    message: String,
}

fn timeout_result(
    manifest: &Manifest,
    execution_id: String,
    start: DateTime<Utc>,
    message: &str,
) -> ExecutionResult {
    ExecutionResult::failure(&manifest.name, execution_id, start, ErrorCode::Timeout, message)
}

fn finalize(
    manifest: &Manifest,
    execution_id: String,
    start: DateTime<Utc>,
    parsed: RemoteExecutionResponse,
) -> ExecutionResult {
    let end = Utc::now();
    ExecutionResult {
        success: parsed.success,
        output: parsed.output,
        metadata: ExecutionMetadata {
            tool_name: manifest.name.clone(),
            container_image: None,
            start_time: start,
            end_time: end,
            duration_ms: duration_ms(start, end),
            cached: false,
            execution_id,
        },
        error: parsed
            .error
            .map(|e| ExecutionError::new(e.code, e.message)),
        warnings: parsed.warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_and_health_urls_trim_trailing_slash() {
        let provider = RemoteProvider::new("https://exec.example.com/", None);
        assert_eq!(provider.execute_url(), "https://exec.example.com/execute");
        assert_eq!(provider.health_url(), "https://exec.example.com/health");
    }

    #[test]
    fn remote_options_carries_timeout_in_milliseconds() {
        let mut options = ExecutionOptions::default();
        options.timeout = Some(Duration::from_secs(2));
        let remote: RemoteOptions = (&options).into();
        assert_eq!(remote.timeout_ms, Some(2000));
    }
}
