use stepflow_config::FlowVersion;
use tracing::debug;

use crate::error::GraphError;
use crate::mutation::{delete_action, ensure_unlocked, set_skip};
use crate::navigation::{branch_subtree, find_by_name};

/// Flow after a bulk delete, together with the editor's open step.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkDeleteOutcome {
  pub flow: FlowVersion,
  /// `None` if the previously open step no longer exists.
  pub open_step: Option<String>,
}

/// Delete every selected step as a single edit.
///
/// Names already gone (including steps removed earlier in the same batch as
/// part of a deleted router or loop) are skipped.
pub fn bulk_delete<S: AsRef<str>>(
  flow: &FlowVersion,
  selected: &[S],
  open_step: Option<&str>,
) -> Result<BulkDeleteOutcome, GraphError> {
  ensure_unlocked(flow)?;

  let mut current = flow.clone();
  let mut open_step = open_step.map(str::to_string);
  for name in selected {
    let name = name.as_ref();
    let Ok(found) = find_by_name(&current, name) else {
      continue;
    };
    if let Some(open) = open_step.as_deref() {
      let removes_open =
        open == name || branch_subtree(&current, found.step).any(|d| d.step.name == open);
      if removes_open {
        open_step = None;
      }
    }
    current = delete_action(&current, name)?;
  }

  debug!(
    flow_version_id = %flow.id,
    selected = selected.len(),
    removed = flow.steps.len() - current.steps.len(),
    "bulk_delete"
  );
  Ok(BulkDeleteOutcome {
    flow: current,
    open_step,
  })
}

/// Clear `skip` if every selected step is skipped, otherwise set it on all.
pub fn toggle_skip<S: AsRef<str>>(
  flow: &FlowVersion,
  selected: &[S],
) -> Result<FlowVersion, GraphError> {
  let mut all_skipped = true;
  for name in selected {
    all_skipped &= find_by_name(flow, name.as_ref())?.step.skip;
  }
  set_skip(flow, selected, !all_skipped)
}
