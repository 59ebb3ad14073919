//! Deterministic filesystem layout rooted at a user home directory: a
//! cache tree keyed by tool name and version, a registry file mapping
//! installed tools to versions, and a per-project override directory.

mod errors;
mod layout;
mod registry;
mod version;

pub use errors::{StoreError, StoreResult};
pub use layout::{project_tools_json, project_vendor_dir, Layout};
pub use registry::{with_exclusive_lock, RegistryScope, ToolsRegistry};
pub use version::{highest_cached_version, compare_versions};
