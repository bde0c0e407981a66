use serde_json::{Value, json};
use stepflow_config::{FlowVersion, StepKind};
use stepflow_graph::transform_steps;

use crate::error::MigrationError;
use crate::pipeline::Migration;

const OPTIONS_KEY: &str = "error_handling_options";
const FLAGS: [&str; 2] = ["continue_on_failure", "retry_on_failure"];

/// Moves the flat `continue_on_failure` / `retry_on_failure` flags of
/// actions into `error_handling_options.<flag>.value`. Flags that were never
/// set default to `false`. An option already present in the nested form is
/// kept as is. A non-bool flag or a non-object options value fails the
/// migration rather than being dropped.
///
/// "2" -> "3".
pub struct ErrorHandlingOptions;

impl Migration for ErrorHandlingOptions {
  fn name(&self) -> &str {
    "error-handling-options"
  }

  fn target_schema_version(&self) -> Option<&str> {
    Some("2")
  }

  fn migrate(&self, flow: FlowVersion) -> Result<FlowVersion, MigrationError> {
    let mut flow = transform_steps(&flow, |step| {
      if step.kind != StepKind::Action {
        return Ok::<_, MigrationError>(());
      }
      if step.settings.is_null() {
        step.settings = json!({});
      }
      let Some(settings) = step.settings.as_object_mut() else {
        return Err(MigrationError::failed(
          self.name(),
          format!("action '{}' has non-object settings", step.name),
        ));
      };

      let mut options = match settings.remove(OPTIONS_KEY) {
        None | Some(Value::Null) => Default::default(),
        Some(Value::Object(options)) => options,
        Some(other) => {
          return Err(MigrationError::failed(
            self.name(),
            format!("action '{}' has non-object {OPTIONS_KEY}: {other}", step.name),
          ));
        }
      };
      for flag in FLAGS {
        let value = match settings.remove(flag) {
          None | Some(Value::Null) => false,
          Some(Value::Bool(value)) => value,
          Some(other) => {
            return Err(MigrationError::failed(
              self.name(),
              format!("action '{}' has non-bool {flag}: {other}", step.name),
            ));
          }
        };
        options
          .entry(flag)
          .or_insert_with(|| json!({ "value": value }));
      }
      settings.insert(OPTIONS_KEY.to_string(), Value::Object(options));
      Ok(())
    })?;
    flow.schema_version = Some("3".to_string());
    Ok(flow)
  }
}
