use stepflow_config::FlowVersion;
use tracing::error;

use crate::error::LoadError;
use crate::pipeline::MigrationPipeline;

/// Deserialize a persisted flow version and bring it to the current schema.
///
/// A document that cannot be migrated is a data-integrity problem: callers
/// must not fall back to the unmigrated graph.
pub fn load_flow_version(
  raw: serde_json::Value,
  pipeline: &MigrationPipeline,
) -> Result<FlowVersion, LoadError> {
  let flow: FlowVersion = serde_json::from_value(raw)?;
  let flow_version_id = flow.id.clone();

  pipeline.apply(flow).map_err(|source| {
    error!(flow_version_id = %flow_version_id, error = %source, "flow_version_migration_failed");
    LoadError::Migration {
      flow_version_id,
      source,
    }
  })
}
