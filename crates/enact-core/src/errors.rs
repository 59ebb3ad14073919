use enact_exec::{ErrorCode, ExecutionError};
use enact_fetcher::FetchError;
use enact_manifest::ManifestError;
use enact_resolver::ResolverError;
use enact_store::StoreError;
use enact_trust::{ConfigError, VerifyError};
use std::path::PathBuf;
use thiserror::Error;

pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Composes every sub-crate's typed error. Each variant maps onto the
/// shared `ErrorCode` taxonomy via [`CoreError::error_code`], the
/// conversion `enact-core` performs at its own boundary so callers
/// (the CLI) never need to know which crate a failure came from.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Resolver(#[from] ResolverError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Trust(#[from] VerifyError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error("tool '{tool}' has no action '{action}'")]
    ActionNotFound { tool: String, action: String },
    #[error("'{0}' does not name a fetchable registry tool")]
    NotFetchable(String),
    #[error("no registry client configured; cannot fetch '{0}'")]
    NoRegistryConfigured(String),
    #[error("invalid input JSON: {0}")]
    InvalidInputJson(#[from] serde_json::Error),
    #[error("malformed --input entry '{0}', expected key=value")]
    InvalidKeyValue(String),
    #[error("input file must be a JSON object, got {0}")]
    InputNotAnObject(String),
    #[error("io error reading {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("invalid config at {0}: {1}")]
    ConfigParse(PathBuf, #[source] serde_yaml::Error),
}

impl CoreError {
    /// Maps this error onto the structured `error.code` taxonomy.
    /// `Execution` passes its inner code through unchanged since a
    /// provider has already made that judgment.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            CoreError::Resolver(_) => ErrorCode::NotFound,
            CoreError::Fetch(e) => fetch_error_code(e),
            CoreError::Store(_) => ErrorCode::NotFound,
            CoreError::Config(_) => ErrorCode::TrustError,
            CoreError::Trust(_) => ErrorCode::TrustError,
            CoreError::Manifest(_) => ErrorCode::ValidationError,
            CoreError::Execution(e) => e.code,
            CoreError::ActionNotFound { .. } => ErrorCode::NotFound,
            CoreError::NotFetchable(_) => ErrorCode::NotFound,
            CoreError::NoRegistryConfigured(_) => ErrorCode::NetworkError,
            CoreError::InvalidInputJson(_) => ErrorCode::ValidationError,
            CoreError::InvalidKeyValue(_) => ErrorCode::ValidationError,
            CoreError::InputNotAnObject(_) => ErrorCode::ValidationError,
            CoreError::Io(..) => ErrorCode::NotFound,
            CoreError::ConfigParse(..) => ErrorCode::TrustError,
        }
    }
}

fn fetch_error_code(err: &FetchError) -> ErrorCode {
    match err {
        FetchError::TrustDenied { .. } | FetchError::TrustPromptRequired(_) | FetchError::Trust(_) => {
            ErrorCode::TrustError
        }
        FetchError::Download(..) | FetchError::Registry(_) | FetchError::InvalidBundleUrl(_) => {
            ErrorCode::NetworkError
        }
        FetchError::HashMismatch { .. } => ErrorCode::TrustError,
        FetchError::Io(..) | FetchError::ExtractFailed(..) => ErrorCode::NetworkError,
        FetchError::Store(_) => ErrorCode::NotFound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_errors_pass_their_code_through_unchanged() {
        let err = CoreError::Execution(ExecutionError::new(ErrorCode::Timeout, "timed out"));
        assert_eq!(err.error_code(), ErrorCode::Timeout);
    }

    #[test]
    fn trust_denial_is_a_trust_error() {
        let err = CoreError::Fetch(FetchError::TrustDenied {
            name: "acme/lint".to_string(),
            minimum: 1,
        });
        assert_eq!(err.error_code(), ErrorCode::TrustError);
    }
}
