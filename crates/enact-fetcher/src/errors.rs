use std::path::PathBuf;
use thiserror::Error;

pub type FetchResult<T> = std::result::Result<T, FetchError>;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("registry request failed: {0}")]
    Registry(#[from] anyhow::Error),
    #[error(transparent)]
    Store(#[from] enact_store::StoreError),
    #[error(transparent)]
    Trust(#[from] enact_trust::VerifyError),
    #[error("'{name}' requires {minimum} attestation(s) from a trusted identity")]
    TrustDenied { name: String, minimum: u32 },
    #[error("attestation quorum not met for '{0}'; an interactive trust decision is required")]
    TrustPromptRequired(String),
    #[error("download of {0} failed: {1}")]
    Download(String, #[source] reqwest::Error),
    #[error("io error on {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("bundle hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },
    #[error("tar extraction into {0} failed with status {1:?}")]
    ExtractFailed(PathBuf, Option<i32>),
    #[error("invalid bundle url: {0}")]
    InvalidBundleUrl(String),
}
