//! `enact install` / `enact uninstall`: standalone registry fetch and
//! `tools.json` bookkeeping, independent of running anything.

use crate::commands::registry_path;
use crate::wiring::Environment;
use anyhow::Result;
use clap::ArgMatches;
use enact_fetcher::FetchOptions;
use enact_resolver::Specifier;
use serde_json::json;
use std::path::PathBuf;

pub async fn install(env: Environment, matches: &ArgMatches) -> Result<i32> {
    let specifier = matches.get_one::<String>("specifier").expect("required");
    let global = matches.get_flag("global");
    let project = matches.get_one::<String>("project").map(PathBuf::from);
    let acknowledge_yanked = matches.get_flag("acknowledge-yanked");
    let json_output = matches.get_flag("json");

    let Some((client, verifier)) = env.registry().await? else {
        eprintln!("error: no registry configured (set ENACT_REGISTRY_URL)");
        return Ok(1);
    };

    let Specifier::Name { name, version, .. } = enact_resolver::parse_specifier(specifier) else {
        eprintln!("error: '{specifier}' does not name a fetchable registry tool");
        return Ok(1);
    };

    let path = registry_path(&env, project.as_deref(), global);
    let options = FetchOptions { acknowledge_yanked };

    let outcome = enact_fetcher::fetch_bundle(
        client.as_ref(),
        &verifier,
        &env.trust_config,
        &env.layout,
        &path,
        &name,
        version.as_deref(),
        &options,
    )
    .await;

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("error: {e}");
            return Ok(exit_code_for_fetch_error(&e));
        }
    };

    for warning in &outcome.warnings {
        match warning {
            enact_fetcher::Warning::YankedVersion { name, version } => {
                eprintln!("warning: {name}@{version} has been yanked");
            }
        }
    }

    if json_output {
        let value = json!({
            "name": specifier,
            "version": outcome.version,
            "path": outcome.path,
            "cached": outcome.cached,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("installed {specifier}@{} -> {}", outcome.version, outcome.path.display());
    }

    Ok(0)
}

pub async fn uninstall(env: Environment, matches: &ArgMatches) -> Result<i32> {
    let name = matches.get_one::<String>("name").expect("required");
    let global = matches.get_flag("global");
    let project = matches.get_one::<String>("project").map(PathBuf::from);
    let path = registry_path(&env, project.as_deref(), global);

    let result = enact_store::with_exclusive_lock(&path, std::time::Duration::from_secs(10), |registry| {
        registry.uninstall(name)
    });

    match result {
        Ok(()) => {
            println!("uninstalled {name}");
            Ok(0)
        }
        Err(e) => {
            eprintln!("error: {e}");
            Ok(1)
        }
    }
}

fn exit_code_for_fetch_error(err: &enact_fetcher::FetchError) -> i32 {
    match err {
        enact_fetcher::FetchError::TrustDenied { .. } | enact_fetcher::FetchError::TrustPromptRequired(_) => 3,
        _ => 1,
    }
}
