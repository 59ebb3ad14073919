//! Entry point for the `enact` binary: parses arguments, wires the
//! shared environment, dispatches to a subcommand handler, and maps
//! its result onto a process exit code.

mod cli;
mod commands;
mod logging;
mod registry_client;
mod wiring;

use wiring::Environment;

#[tokio::main]
async fn main() {
    let matches = cli::build_cli().get_matches();
    let verbose = matches.get_flag("verbose");
    logging::init(verbose);

    let exit_code = match run(matches).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            1
        }
    };

    std::process::exit(exit_code);
}

async fn run(matches: clap::ArgMatches) -> anyhow::Result<i32> {
    let env = Environment::load()?;

    match matches.subcommand() {
        Some(("get", sub)) => commands::get(env, sub).await,
        Some(("run", sub)) => commands::run(env, sub).await,
        Some(("install", sub)) => commands::install(env, sub).await,
        Some(("uninstall", sub)) => commands::uninstall(env, sub).await,
        Some(("sign", sub)) => commands::sign(env, sub).await,
        Some(("tools", sub)) => match sub.subcommand() {
            Some(("list", sub)) => commands::tools_list(env, sub).await,
            _ => unreachable!("clap requires a `tools` subcommand"),
        },
        _ => unreachable!("clap requires a subcommand"),
    }
}
