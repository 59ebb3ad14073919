use std::path::PathBuf;
use thiserror::Error;

pub type ManifestResult<T> = std::result::Result<T, ManifestError>;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("no skill manifest found in {0}")]
    NotFound(PathBuf),
    #[error("cannot read manifest file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("cannot parse manifest file {0}: {1}")]
    Parse(PathBuf, #[source] serde_yaml::Error),
    #[error("invalid tool name '{0}': expected lowercase hierarchical segments, e.g. 'acme/lint'")]
    InvalidName(String),
    #[error("invalid duration '{0}': expected an integer followed by ms, s, m or h")]
    InvalidDuration(String),
}
