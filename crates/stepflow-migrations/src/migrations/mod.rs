//! Built-in migrations, one module per schema change.

mod branch_to_router;
mod error_handling_options;
mod pin_connector_versions;

pub use branch_to_router::BranchToRouter;
pub use error_handling_options::ErrorHandlingOptions;
pub use pin_connector_versions::PinConnectorVersions;

/// Schema version produced by the last built-in migration.
pub const CURRENT_SCHEMA_VERSION: &str = "3";
