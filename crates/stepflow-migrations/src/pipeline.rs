use std::collections::HashSet;

use stepflow_config::FlowVersion;
use stepflow_graph::violations;
use tracing::{info, instrument};

use crate::error::MigrationError;
use crate::migrations::{BranchToRouter, ErrorHandlingOptions, PinConnectorVersions};

/// A pure transform from one schema version to the next.
pub trait Migration: Send + Sync {
  /// Stable identifier used in logs and errors.
  fn name(&self) -> &str;

  /// The schema version this migration applies to. `None` matches graphs
  /// saved before versions were recorded.
  fn target_schema_version(&self) -> Option<&str>;

  /// Convert the flow. Implementations set the output `schema_version`
  /// themselves.
  fn migrate(&self, flow: FlowVersion) -> Result<FlowVersion, MigrationError>;
}

/// An ordered table of migrations.
///
/// List order is authoritative: after every applied migration the scan
/// starts again from the top, so one call can carry a graph through any
/// number of versions.
pub struct MigrationPipeline {
  migrations: Vec<Box<dyn Migration>>,
}

impl MigrationPipeline {
  pub fn new(migrations: Vec<Box<dyn Migration>>) -> Self {
    Self { migrations }
  }

  /// The built-in migrations, oldest first.
  pub fn standard() -> Self {
    Self::new(vec![
      Box::new(PinConnectorVersions),
      Box::new(BranchToRouter),
      Box::new(ErrorHandlingOptions),
    ])
  }

  pub fn migrations(&self) -> impl Iterator<Item = &dyn Migration> {
    self.migrations.iter().map(|m| m.as_ref())
  }

  /// Migrate `flow` until no migration targets its schema version.
  ///
  /// A graph already at the latest version comes back unchanged. A
  /// migration fails the run only for structural violations it introduced;
  /// defects already present in its input are carried through.
  #[instrument(skip_all, fields(flow_version_id = %flow.id))]
  pub fn apply(&self, flow: FlowVersion) -> Result<FlowVersion, MigrationError> {
    let mut flow = flow;
    let mut migrated_from = HashSet::new();

    while let Some(migration) = self.next_for(&flow) {
      let from = flow.schema_version.clone();
      if !migrated_from.insert(from.clone()) {
        return Err(MigrationError::Cycle { version: from });
      }

      let existing = violations(&flow);
      let migrated = migration.migrate(flow)?;
      if migrated.schema_version == from {
        return Err(MigrationError::VersionNotAdvanced {
          migration: migration.name().to_string(),
          version: from,
        });
      }
      if let Some(source) = violations(&migrated)
        .into_iter()
        .find(|violation| !existing.contains(violation))
      {
        return Err(MigrationError::Integrity {
          migration: migration.name().to_string(),
          source,
        });
      }

      info!(
        migration = %migration.name(),
        from = ?from,
        to = ?migrated.schema_version,
        "migration_applied"
      );
      flow = migrated;
    }

    Ok(flow)
  }

  fn next_for(&self, flow: &FlowVersion) -> Option<&dyn Migration> {
    self
      .migrations()
      .find(|m| m.target_schema_version() == flow.schema_version.as_deref())
  }
}

impl Default for MigrationPipeline {
  fn default() -> Self {
    Self::standard()
  }
}
