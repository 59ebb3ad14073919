//! Argument grammar for the `enact` binary — one `Command` per
//! subcommand, builder style (no `clap` `derive` feature).

use clap::{crate_authors, crate_description, crate_version, Arg, ArgAction, Command};

pub fn build_cli() -> Command {
    Command::new("enact")
        .version(crate_version!())
        .author(crate_authors!())
        .about(crate_description!())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Enable debug-level logging"),
        )
        .subcommand(get_command())
        .subcommand(run_command())
        .subcommand(install_command())
        .subcommand(uninstall_command())
        .subcommand(tools_command())
        .subcommand(sign_command())
}

fn get_command() -> Command {
    Command::new("get")
        .about("Look up a tool's metadata without running it")
        .arg(Arg::new("specifier").required(true).help("name[:action][@version], a path, or an alias"))
        .arg(
            Arg::new("project")
                .long("project")
                .value_name("PATH")
                .help("Project root to search for a project-scoped install"),
        )
        .arg(Arg::new("json").long("json").action(ArgAction::SetTrue).help("Emit JSON"))
}

fn run_command() -> Command {
    Command::new("run")
        .about("Resolve, verify, and execute a tool")
        .arg(Arg::new("specifier").required(true).help("name[:action][@version], a path, or an alias"))
        .arg(
            Arg::new("project")
                .long("project")
                .value_name("PATH")
                .help("Project root to resolve project-scoped installs and overrides against"),
        )
        .arg(Arg::new("args").long("args").value_name("JSON").help("Input parameters as a JSON object"))
        .arg(
            Arg::new("input-file")
                .long("input-file")
                .value_name("PATH")
                .help("Input parameters read from a JSON file"),
        )
        .arg(
            Arg::new("input")
                .long("input")
                .value_name("KEY=VALUE")
                .action(ArgAction::Append)
                .help("One input parameter, repeatable; value parsed as JSON when possible"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_name("DURATION")
                .help("Overrides the manifest/default execution timeout, e.g. 30s, 2m"),
        )
        .arg(
            Arg::new("local")
                .long("local")
                .action(ArgAction::SetTrue)
                .help("Force the local process provider"),
        )
        .arg(
            Arg::new("remote")
                .long("remote")
                .action(ArgAction::SetTrue)
                .help("Force the remote execution provider"),
        )
        .arg(
            Arg::new("local-only")
                .long("local-only")
                .action(ArgAction::SetTrue)
                .help("Never attempt a registry fetch when resolution misses"),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .action(ArgAction::SetTrue)
                .help("Print what would run without executing it"),
        )
        .arg(
            Arg::new("acknowledge-yanked")
                .long("acknowledge-yanked")
                .action(ArgAction::SetTrue)
                .help("Suppress the yanked-version warning for this run"),
        )
        .arg(Arg::new("json").long("json").action(ArgAction::SetTrue).help("Emit JSON"))
}

fn install_command() -> Command {
    Command::new("install")
        .about("Fetch and cache a registry tool without running it")
        .arg(Arg::new("specifier").required(true).help("name[@version]"))
        .arg(
            Arg::new("global")
                .short('g')
                .long("global")
                .action(ArgAction::SetTrue)
                .help("Install into the user-global registry instead of the project one"),
        )
        .arg(
            Arg::new("project")
                .long("project")
                .value_name("PATH")
                .help("Project root to install into (ignored with --global)"),
        )
        .arg(
            Arg::new("acknowledge-yanked")
                .long("acknowledge-yanked")
                .action(ArgAction::SetTrue)
                .help("Suppress the yanked-version warning for this install"),
        )
        .arg(Arg::new("json").long("json").action(ArgAction::SetTrue).help("Emit JSON"))
}

fn uninstall_command() -> Command {
    Command::new("uninstall")
        .about("Remove an installed tool and any aliases pointing at it")
        .arg(Arg::new("name").required(true))
        .arg(
            Arg::new("global")
                .short('g')
                .long("global")
                .action(ArgAction::SetTrue)
                .help("Uninstall from the user-global registry instead of the project one"),
        )
        .arg(Arg::new("project").long("project").value_name("PATH"))
}

fn tools_command() -> Command {
    Command::new("tools")
        .about("Inspect installed tools")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("list")
                .about("List installed tools and aliases")
                .arg(
                    Arg::new("global")
                        .short('g')
                        .long("global")
                        .action(ArgAction::SetTrue)
                        .help("List the user-global registry instead of the project one"),
                )
                .arg(Arg::new("project").long("project").value_name("PATH"))
                .arg(Arg::new("json").long("json").action(ArgAction::SetTrue)),
        )
}

fn sign_command() -> Command {
    Command::new("sign")
        .about("Sign a bundle or installed tool and submit the attestation to the registry")
        .arg(Arg::new("target").required(true).help("A bundle path or an installed tool@version"))
        .arg(
            Arg::new("local")
                .long("local")
                .action(ArgAction::SetTrue)
                .help("Produce the attestation bundle without submitting it to the registry"),
        )
        .arg(Arg::new("json").long("json").action(ArgAction::SetTrue).help("Emit JSON"))
}
