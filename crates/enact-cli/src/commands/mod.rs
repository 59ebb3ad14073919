mod get;
mod install;
mod run;
mod sign;
mod tools;

pub use get::get;
pub use install::{install, uninstall};
pub use run::run;
pub use sign::sign;
pub use tools::tools_list;

use crate::wiring::Environment;
use std::path::{Path, PathBuf};

/// Picks the `tools.json` a command targets: the project-scoped file
/// when a project root was given and `--global` wasn't, the
/// user-global one otherwise.
fn registry_path(env: &Environment, project: Option<&Path>, global: bool) -> PathBuf {
    if !global {
        if let Some(root) = project {
            return enact_store::project_tools_json(root);
        }
    }
    env.layout.user_tools_json()
}
