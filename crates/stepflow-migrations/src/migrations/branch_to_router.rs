use serde_json::{Map, Value, json};
use stepflow_config::{FlowVersion, StepKind};
use stepflow_graph::transform_steps;

use crate::error::MigrationError;
use crate::pipeline::Migration;

const CONDITION_BRANCH: &str = "Branch 1";
const FALLBACK_BRANCH: &str = "Otherwise";

/// Retags legacy two-way `branch` steps as routers.
///
/// The old true branch becomes `"Branch 1"` carrying the step's conditions,
/// the old false branch becomes the `"Otherwise"` fallback. Branch contents
/// stay where they are.
///
/// "1" -> "2".
pub struct BranchToRouter;

impl Migration for BranchToRouter {
  fn name(&self) -> &str {
    "branch-to-router"
  }

  fn target_schema_version(&self) -> Option<&str> {
    Some("1")
  }

  fn migrate(&self, flow: FlowVersion) -> Result<FlowVersion, MigrationError> {
    let mut flow = transform_steps(&flow, |step| {
      if step.kind != StepKind::Branch {
        return Ok(());
      }
      if step.branches.len() != 2 {
        return Err(MigrationError::failed(
          self.name(),
          format!(
            "branch step '{}' has {} branches, expected 2",
            step.name,
            step.branches.len()
          ),
        ));
      }

      let mut settings = match std::mem::take(&mut step.settings) {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
          return Err(MigrationError::failed(
            self.name(),
            format!("branch step '{}' has non-object settings: {other}", step.name),
          ));
        }
      };
      let conditions = settings.remove("conditions").unwrap_or_else(|| json!([]));
      settings.insert(
        "branches".to_string(),
        json!([
          {
            "branch_name": CONDITION_BRANCH,
            "branch_type": "CONDITION",
            "conditions": conditions,
          },
          {
            "branch_name": FALLBACK_BRANCH,
            "branch_type": "FALLBACK",
          },
        ]),
      );
      settings.insert("execution_type".to_string(), json!("EXECUTE_FIRST_MATCH"));

      step.kind = StepKind::Router;
      step.settings = Value::Object(settings);
      step.branches[0].branch_name = CONDITION_BRANCH.to_string();
      step.branches[1].branch_name = FALLBACK_BRANCH.to_string();
      Ok(())
    })?;
    flow.schema_version = Some("2".to_string());
    Ok(flow)
  }
}
