//! `enact tools list`: enumerates installed tools and aliases from a
//! `tools.json`.

use crate::commands::registry_path;
use crate::wiring::Environment;
use anyhow::Result;
use clap::ArgMatches;
use enact_store::ToolsRegistry;
use serde_json::json;
use std::path::PathBuf;

pub async fn tools_list(env: Environment, matches: &ArgMatches) -> Result<i32> {
    let global = matches.get_flag("global");
    let project = matches.get_one::<String>("project").map(PathBuf::from);
    let json_output = matches.get_flag("json");

    let path = registry_path(&env, project.as_deref(), global);
    let registry = ToolsRegistry::load(&path)?;

    if json_output {
        let value = json!({
            "tools": registry.tools,
            "aliases": registry.aliases,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(0);
    }

    if registry.tools.is_empty() {
        println!("no tools installed");
        return Ok(0);
    }

    for (name, version) in &registry.tools {
        println!("{name}@{version}");
    }
    if !registry.aliases.is_empty() {
        println!();
        println!("aliases:");
        for (alias, target) in &registry.aliases {
            println!("  {alias} -> {target}");
        }
    }

    Ok(0)
}
