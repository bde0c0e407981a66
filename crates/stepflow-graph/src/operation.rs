use serde::{Deserialize, Serialize};
use stepflow_config::{FlowVersion, Step};

use crate::error::GraphError;
use crate::mutation::{
  StepLocation, StepUpdate, add_action_at, add_branch, change_name, delete_action, delete_branch,
  duplicate_action, move_action_at, set_skip, update_action,
};

/// A single editor request against a flow version.
///
/// Operations serialize as `{"type": "ADD_ACTION", ...}` so they can travel
/// between the editor and the backend, and so that paste can hand back a
/// plan instead of a finished graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowOperation {
  AddAction {
    parent_step: String,
    #[serde(default)]
    location: StepLocation,
    action: Step,
  },
  UpdateAction {
    action: StepUpdate,
  },
  /// Deleting names that are not in the graph is not an error.
  DeleteAction {
    names: Vec<String>,
  },
  MoveAction {
    name: String,
    new_parent_step: String,
    #[serde(default)]
    location: StepLocation,
  },
  DuplicateAction {
    name: String,
  },
  SetSkipAction {
    names: Vec<String>,
    skip: bool,
  },
  AddBranch {
    router: String,
    branch_index: usize,
    branch_name: String,
  },
  DeleteBranch {
    router: String,
    branch_index: usize,
  },
  ChangeName {
    display_name: String,
  },
}

/// Apply one operation, returning the next flow version.
pub fn apply_operation(
  flow: &FlowVersion,
  operation: &FlowOperation,
) -> Result<FlowVersion, GraphError> {
  match operation {
    FlowOperation::AddAction {
      parent_step,
      location,
      action,
    } => add_action_at(flow, parent_step, *location, action.clone()),
    FlowOperation::UpdateAction { action } => update_action(flow, action.clone()),
    FlowOperation::DeleteAction { names } => {
      let mut next = flow.clone();
      for name in names {
        next = delete_action(&next, name)?;
      }
      Ok(next)
    }
    FlowOperation::MoveAction {
      name,
      new_parent_step,
      location,
    } => move_action_at(flow, name, new_parent_step, *location),
    FlowOperation::DuplicateAction { name } => duplicate_action(flow, name),
    FlowOperation::SetSkipAction { names, skip } => set_skip(flow, names.as_slice(), *skip),
    FlowOperation::AddBranch {
      router,
      branch_index,
      branch_name,
    } => add_branch(flow, router, *branch_index, branch_name),
    FlowOperation::DeleteBranch {
      router,
      branch_index,
    } => delete_branch(flow, router, *branch_index),
    FlowOperation::ChangeName { display_name } => change_name(flow, display_name),
  }
}

/// Apply operations in order. The first failure aborts the whole batch and
/// the input is left as it was.
pub fn apply_operations(
  flow: &FlowVersion,
  operations: &[FlowOperation],
) -> Result<FlowVersion, GraphError> {
  operations
    .iter()
    .try_fold(flow.clone(), |current, operation| {
      apply_operation(&current, operation)
    })
}
