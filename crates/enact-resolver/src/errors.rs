use std::path::PathBuf;
use thiserror::Error;

pub type ResolverResult<T> = std::result::Result<T, ResolverError>;

#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("could not resolve '{specifier}'; searched: {}", format_searched(.searched))]
    NotFound {
        specifier: String,
        searched: Vec<PathBuf>,
    },
    #[error("alias '{0}' is not registered in any tools.json")]
    AliasNotFound(String),
    #[error(transparent)]
    Manifest(#[from] enact_manifest::ManifestError),
    #[error(transparent)]
    Store(#[from] enact_store::StoreError),
}

fn format_searched(searched: &[PathBuf]) -> String {
    searched
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
