use thiserror::Error;
use std::path::PathBuf;

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read trust config {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("failed to parse trust config {0}: {1}")]
    Parse(PathBuf, #[source] serde_yaml::Error),
}
