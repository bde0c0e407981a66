//! Stepflow Migrations
//!
//! Brings persisted flow versions forward to the shape the current runtime
//! expects. Every snapshot carries a `schema_version` tag; a
//! [`MigrationPipeline`] repeatedly applies the migration whose target tag
//! matches until none does.
//!
//! Loaders should go through [`load_flow_version`] so that a snapshot that
//! cannot be migrated is refused instead of being handed to an editor or
//! runtime half-converted.

mod error;
mod loader;
mod migrations;
mod pipeline;

pub use error::{LoadError, MigrationError};
pub use loader::load_flow_version;
pub use migrations::{
  BranchToRouter, CURRENT_SCHEMA_VERSION, ErrorHandlingOptions, PinConnectorVersions,
};
pub use pipeline::{Migration, MigrationPipeline};
