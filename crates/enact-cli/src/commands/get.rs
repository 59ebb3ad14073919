//! `enact get`: resolves a tool and prints its manifest metadata.
//! Attempts a registry fetch on a resolution miss, the same fallback
//! `run` performs, but never executes anything.

use crate::commands::registry_path;
use crate::wiring::Environment;
use anyhow::{anyhow, Result};
use clap::ArgMatches;
use enact_fetcher::FetchOptions;
use enact_resolver::{ResolverError, Specifier};
use serde_json::json;
use std::path::PathBuf;

pub async fn get(env: Environment, matches: &ArgMatches) -> Result<i32> {
    let specifier = matches.get_one::<String>("specifier").expect("required");
    let project = matches.get_one::<String>("project").map(PathBuf::from);
    let json_output = matches.get_flag("json");

    let resolution = match enact_resolver::resolve(specifier, project.as_deref(), &env.layout) {
        Ok(resolution) => resolution,
        Err(ResolverError::NotFound { .. }) if enact_core::looks_like_registry_tool(specifier) => {
            fetch_then_resolve(&env, specifier, project.as_deref()).await?
        }
        Err(e) => {
            eprintln!("error: {e}");
            return Ok(1);
        }
    };

    let manifest = &resolution.manifest;
    if json_output {
        let value = json!({
            "name": manifest.name,
            "version": manifest.version,
            "description": manifest.description,
            "from": manifest.from,
            "command": manifest.command,
            "actions": manifest.actions.keys().collect::<Vec<_>>(),
            "env": manifest.env.keys().collect::<Vec<_>>(),
            "origin": format!("{:?}", resolution.origin),
            "source_dir": resolution.source_dir,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{}", manifest.name);
        if let Some(version) = &manifest.version {
            println!("  version: {version}");
        }
        if !manifest.description.is_empty() {
            println!("  description: {}", manifest.description);
        }
        if let Some(from) = &manifest.from {
            println!("  container: {from}");
        }
        println!("  origin: {:?}", resolution.origin);
        println!("  source: {}", resolution.source_dir.display());
        if !manifest.actions.is_empty() {
            println!("  actions: {}", manifest.actions.keys().cloned().collect::<Vec<_>>().join(", "));
        }
    }

    Ok(0)
}

async fn fetch_then_resolve(
    env: &Environment,
    specifier: &str,
    project: Option<&std::path::Path>,
) -> Result<enact_resolver::ToolResolution> {
    let (client, verifier) = env
        .registry()
        .await?
        .ok_or_else(|| anyhow!("'{specifier}' is not installed and no registry is configured"))?;

    let Specifier::Name { name, version, .. } = enact_resolver::parse_specifier(specifier) else {
        return Err(anyhow!("'{specifier}' does not name a fetchable registry tool"));
    };

    let registry_path = registry_path(env, project, false);
    enact_fetcher::fetch_bundle(
        client.as_ref(),
        &verifier,
        &env.trust_config,
        &env.layout,
        &registry_path,
        &name,
        version.as_deref(),
        &FetchOptions::default(),
    )
    .await?;

    Ok(enact_resolver::resolve(specifier, project, &env.layout)?)
}
