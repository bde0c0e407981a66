use serde_json::Value;
use stepflow_config::{ConnectorRef, FlowVersion};
use stepflow_graph::transform_steps;

use crate::error::MigrationError;
use crate::pipeline::Migration;

/// Replaces `^x.y.z` and `~x.y.z` connector version ranges with the exact
/// version, so a saved graph keeps running against the connector it was
/// built with.
///
/// Unversioned graphs -> "1".
pub struct PinConnectorVersions;

impl Migration for PinConnectorVersions {
  fn name(&self) -> &str {
    "pin-connector-versions"
  }

  fn target_schema_version(&self) -> Option<&str> {
    None
  }

  fn migrate(&self, flow: FlowVersion) -> Result<FlowVersion, MigrationError> {
    let mut flow = transform_steps(&flow, |step| {
      let Some(connector) = ConnectorRef::from_settings(&step.settings) else {
        return Ok::<_, MigrationError>(());
      };
      if !connector.is_pinned() {
        step.settings[ConnectorRef::VERSION_KEY] =
          Value::String(connector.pinned_version().to_string());
      }
      Ok(())
    })?;
    flow.schema_version = Some("1".to_string());
    Ok(flow)
  }
}
