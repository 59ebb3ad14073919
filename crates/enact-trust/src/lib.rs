//! Trust policy configuration and Sigstore attestation verification.

pub mod config;
pub mod errors;
pub mod verify;

pub use config::{Policy, TrustConfig};
pub use errors::{ConfigError, ConfigResult};
pub use verify::{evaluate_gate, fetch_trust_root, GateDecision, Verifier, VerifyError, VerifyResult};
