use thiserror::Error;

pub type VerifyResult<T> = std::result::Result<T, VerifyError>;

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("not a valid attestation source reference: {0}")]
    InvalidReference(String),
    #[error("failed to build sigstore client: {0}")]
    ClientBuildError(#[source] sigstore::errors::SigstoreError),
    #[error("failed to fetch trusted attestation layers: {0}")]
    FetchError(#[source] sigstore::errors::SigstoreError),
    #[error("trust gate failed: {0}")]
    GateFailed(String),
}
