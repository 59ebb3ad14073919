//! `enact run`: resolves, verifies, validates, and executes a skill,
//! wired to whichever providers and registry client the environment
//! makes available.

use crate::wiring::Environment;
use anyhow::Result;
use clap::ArgMatches;
use enact_core::{ExecutionController, RunOutcome, RunRequest};
use enact_exec::ErrorCode;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

pub async fn run(env: Environment, matches: &ArgMatches) -> Result<i32> {
    let specifier = matches.get_one::<String>("specifier").expect("required").clone();
    let project: Option<PathBuf> = matches.get_one::<String>("project").map(PathBuf::from);
    let args_json = matches.get_one::<String>("args").cloned();
    let input_file = matches.get_one::<String>("input-file").map(PathBuf::from);
    let input_kv: Vec<String> = matches
        .get_many::<String>("input")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let timeout = matches
        .get_one::<String>("timeout")
        .map(|raw| enact_manifest::parse_duration(raw))
        .transpose()?;
    let force_local = matches.get_flag("local");
    let force_remote = matches.get_flag("remote");
    let local_only = matches.get_flag("local-only");
    let dry_run = matches.get_flag("dry-run");
    let acknowledge_yanked = matches.get_flag("acknowledge-yanked");
    let json_output = matches.get_flag("json");

    let registry = env.registry().await?;
    let mut controller =
        ExecutionController::new(env.layout.clone(), env.router, env.trust_config.clone());
    if let Some((client, verifier)) = registry {
        controller = controller.with_registry(client, verifier);
    }

    let cancellation = CancellationToken::new();
    let ctrl_c_token = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_token.cancel();
        }
    });

    let req = RunRequest {
        specifier: &specifier,
        project_root: project.as_deref(),
        input_file: input_file.as_deref(),
        args_json: args_json.as_deref(),
        input_kv: &input_kv,
        timeout,
        force_local,
        force_remote,
        local_only,
        dry_run,
        acknowledge_yanked,
        verbose: matches!(std::env::var("RUST_LOG"), Ok(_)),
        cancellation,
    };

    let outcome = match controller.run(req).await {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("error: {e}");
            return Ok(exit_code_for_error(&e));
        }
    };

    match outcome {
        RunOutcome::DryRun(preview) => {
            if json_output {
                println!("{}", serde_json::to_string_pretty(&preview)?);
            } else {
                println!("would run {} via {}", preview.tool_name, preview.provider);
                println!("  command: {}", preview.command.join(" "));
                if !preview.env_keys.is_empty() {
                    println!("  env: {}", preview.env_keys.join(", "));
                }
            }
            Ok(0)
        }
        RunOutcome::Executed(result) => {
            if json_output {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", result.output.stdout);
                if !result.output.stderr.is_empty() {
                    eprint!("{}", result.output.stderr);
                }
                for warning in &result.warnings {
                    eprintln!("warning[{}]: {}", warning.code, warning.message);
                }
                if let Some(error) = &result.error {
                    eprintln!("error[{:?}]: {}", error.code, error.message);
                }
            }
            Ok(exit_code_for_result(&result))
        }
    }
}

fn exit_code_for_result(result: &enact_exec::ExecutionResult) -> i32 {
    if result.success {
        return 0;
    }
    if let Some(error) = &result.error {
        match error.code {
            ErrorCode::ValidationError => return 2,
            ErrorCode::TrustError => return 3,
            ErrorCode::Timeout => return 124,
            _ => {}
        }
    }
    match result.output.exit_code {
        Some(code) if code != 0 => code,
        _ => 1,
    }
}

fn exit_code_for_error(err: &enact_core::CoreError) -> i32 {
    match err.error_code() {
        ErrorCode::ValidationError => 2,
        ErrorCode::TrustError => 3,
        ErrorCode::Timeout => 124,
        _ => 1,
    }
}
