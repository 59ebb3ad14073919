use std::path::PathBuf;
use thiserror::Error;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("cannot determine the current user's home directory")]
    NoHomeDirectory,
    #[error("cannot create directory {0}: {1}")]
    CreateDir(PathBuf, #[source] std::io::Error),
    #[error("cannot read registry file {0}: {1}")]
    ReadRegistry(PathBuf, #[source] std::io::Error),
    #[error("cannot parse registry file {0}: {1}")]
    ParseRegistry(PathBuf, #[source] serde_json::Error),
    #[error("cannot write registry file {0}: {1}")]
    WriteRegistry(PathBuf, #[source] std::io::Error),
    #[error("timed out waiting for exclusive lock on {0}")]
    LockTimeout(PathBuf),
    #[error("alias '{0}' already points to a different tool ('{1}')")]
    AliasConflict(String, String),
    #[error("tool '{0}' is not installed")]
    NotInstalled(String),
}
