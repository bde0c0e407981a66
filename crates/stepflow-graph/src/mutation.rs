//! Structural edits.
//!
//! Every operation takes the current flow version by reference and returns a
//! new, independently owned one. The input is never modified, so an editor
//! can keep it for undo. All edits are a find followed by a splice; since
//! navigation enters branches, the same code handles steps at any depth.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use stepflow_config::{Branch, FlowVersion, LOOP_BODY_BRANCH, Step, StepKind, StepSettings};
use tracing::debug;

use crate::clipboard::{ClipboardPayload, PasteLocation, location_of, paste_operations};
use crate::error::GraphError;
use crate::navigation::{LinkSlot, branch_subtree, find_by_name, walk_from};
use crate::operation::apply_operations;

/// Where a step is inserted relative to an anchor step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepLocation {
  /// Directly after the anchor on the anchor's chain.
  #[default]
  After,
  /// At the head of one of the anchor's branches.
  InsideBranch { branch_index: usize },
}

/// New attributes for an existing step. Links and kind are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepUpdate {
  pub name: String,
  #[serde(default)]
  pub display_name: String,
  #[serde(default)]
  pub settings: StepSettings,
  #[serde(default)]
  pub skip: bool,
  #[serde(default = "default_valid")]
  pub valid: bool,
}

fn default_valid() -> bool {
  true
}

impl From<&Step> for StepUpdate {
  fn from(step: &Step) -> Self {
    Self {
      name: step.name.clone(),
      display_name: step.display_name.clone(),
      settings: step.settings.clone(),
      skip: step.skip,
      valid: step.valid,
    }
  }
}

/// The link that points at a step: the flow's root reference or a slot on
/// its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Position {
  Root,
  Link { parent: String, slot: LinkSlot },
}

impl Position {
  fn of(flow: &FlowVersion, name: &str) -> Result<Self, GraphError> {
    let found = find_by_name(flow, name)?;
    Ok(match found.parent {
      None => Position::Root,
      Some(link) => Position::Link {
        parent: link.step.name.clone(),
        slot: link.slot,
      },
    })
  }

  fn read(&self, flow: &FlowVersion) -> Option<String> {
    match self {
      Position::Root => flow.trigger.clone(),
      Position::Link { parent, slot } => {
        let step = flow.get_step(parent)?;
        match slot {
          LinkSlot::Next => step.next.clone(),
          LinkSlot::Branch(index) => step.branches.get(*index).and_then(|b| b.head.clone()),
        }
      }
    }
  }

  fn write(&self, flow: &mut FlowVersion, target: Option<String>) {
    match self {
      Position::Root => flow.trigger = target,
      Position::Link { parent, slot } => {
        let Some(step) = flow.get_step_mut(parent) else {
          return;
        };
        match slot {
          LinkSlot::Next => step.next = target,
          LinkSlot::Branch(index) => {
            if let Some(branch) = step.branches.get_mut(*index) {
              branch.head = target;
            }
          }
        }
      }
    }
  }
}

pub(crate) fn ensure_unlocked(flow: &FlowVersion) -> Result<(), GraphError> {
  if flow.is_locked() {
    return Err(GraphError::FlowLocked {
      flow_version_id: flow.id.clone(),
    });
  }
  Ok(())
}

/// Splice `step` in at `location` relative to `anchor`. The step keeps its
/// branch heads; its `next` is overwritten.
fn insert_step(
  flow: &mut FlowVersion,
  anchor: &str,
  location: StepLocation,
  mut step: Step,
) -> Result<(), GraphError> {
  let branch_count = find_by_name(flow, anchor)?.step.branches.len();
  let slot = match location {
    StepLocation::After => LinkSlot::Next,
    StepLocation::InsideBranch { branch_index } => {
      if branch_index >= branch_count {
        return Err(GraphError::InvalidLocation {
          name: anchor.to_string(),
          message: format!("step has no branch at index {branch_index}"),
        });
      }
      LinkSlot::Branch(branch_index)
    }
  };
  if flow.contains(&step.name) {
    return Err(GraphError::DuplicateName { name: step.name });
  }

  let position = Position::Link {
    parent: anchor.to_string(),
    slot,
  };
  step.next = position.read(flow);
  let name = step.name.clone();
  flow.steps.insert(name.clone(), step);
  position.write(flow, Some(name));
  Ok(())
}

/// Unlink a step from its chain and take it out of the step map. Steps in
/// its branches stay in the map, still linked from the returned step.
fn detach_step(flow: &mut FlowVersion, name: &str) -> Result<Step, GraphError> {
  let position = Position::of(flow, name)?;
  let mut step = flow
    .steps
    .remove(name)
    .ok_or_else(|| GraphError::not_found(name))?;
  position.write(flow, step.next.take());
  Ok(step)
}

/// Remove a step and everything nested in its branches. Returns `false`
/// when the step is not in the graph.
fn remove_step(flow: &mut FlowVersion, name: &str) -> bool {
  let Ok(found) = find_by_name(flow, name) else {
    return false;
  };
  let nested: Vec<String> = branch_subtree(flow, found.step)
    .map(|d| d.step.name.clone())
    .collect();
  let successor = found.step.next.clone();
  let position = match found.parent {
    None => Position::Root,
    Some(link) => Position::Link {
      parent: link.step.name.clone(),
      slot: link.slot,
    },
  };

  position.write(flow, successor);
  flow.steps.remove(name);
  for nested_name in nested {
    flow.steps.remove(&nested_name);
  }
  true
}

/// Validate the kind and branch layout of a step the editor wants to insert,
/// and clear its links.
fn prepare_new_step(step: Step) -> Result<Step, GraphError> {
  if !step.kind.is_insertable() {
    return Err(GraphError::InvalidKind {
      name: step.name,
      kind: step.kind,
    });
  }

  let mut step = step.detached();
  if step.kind == StepKind::Loop && step.branches.is_empty() {
    step.branches.push(Branch::new(LOOP_BODY_BRANCH));
  }
  check_branch_layout(&step)?;
  Ok(step)
}

/// Per-kind branch layout of a step about to be inserted. A loop without
/// branches passes; it gets its body branch on insert.
pub(crate) fn check_branch_layout(step: &Step) -> Result<(), GraphError> {
  let invalid = |message: &str| GraphError::InvalidBranch {
    step: step.name.clone(),
    message: message.to_string(),
  };
  match step.kind {
    StepKind::Loop if step.branches.len() > 1 => {
      return Err(invalid("a loop has exactly one branch"));
    }
    StepKind::Router if step.branches.is_empty() => {
      return Err(invalid("a router needs at least one branch"));
    }
    StepKind::Action if !step.branches.is_empty() => {
      return Err(invalid("an action cannot have branches"));
    }
    _ => {}
  }

  let mut seen = HashSet::new();
  if step
    .branches
    .iter()
    .any(|b| !seen.insert(b.branch_name.as_str()))
  {
    return Err(invalid("branch names must be unique"));
  }
  Ok(())
}

/// Replace a step's own attributes, keeping its kind and links.
pub fn update_action(flow: &FlowVersion, update: StepUpdate) -> Result<FlowVersion, GraphError> {
  ensure_unlocked(flow)?;
  find_by_name(flow, &update.name)?;

  let mut next = flow.clone();
  let step = next
    .get_step_mut(&update.name)
    .ok_or_else(|| GraphError::not_found(&update.name))?;
  step.display_name = update.display_name;
  step.settings = update.settings;
  step.skip = update.skip;
  step.valid = update.valid;

  debug!(flow_version_id = %flow.id, step = %update.name, "action_updated");
  Ok(next)
}

/// Insert `step` directly after `anchor`.
pub fn add_action(flow: &FlowVersion, anchor: &str, step: Step) -> Result<FlowVersion, GraphError> {
  add_action_at(flow, anchor, StepLocation::After, step)
}

/// Insert `step` at `location` relative to `anchor`.
///
/// Links carried by `step` are discarded: a new router or loop starts with
/// empty branches.
pub fn add_action_at(
  flow: &FlowVersion,
  anchor: &str,
  location: StepLocation,
  step: Step,
) -> Result<FlowVersion, GraphError> {
  ensure_unlocked(flow)?;
  let step = prepare_new_step(step)?;
  let name = step.name.clone();

  let mut next = flow.clone();
  insert_step(&mut next, anchor, location, step)?;

  debug!(
    flow_version_id = %flow.id,
    step = %name,
    anchor = %anchor,
    location = ?location,
    "action_added"
  );
  Ok(next)
}

/// Remove a step (and its branch contents), linking its parent to its
/// successor. Deleting a name that is not in the graph returns the input
/// unchanged.
pub fn delete_action(flow: &FlowVersion, name: &str) -> Result<FlowVersion, GraphError> {
  ensure_unlocked(flow)?;
  let mut next = flow.clone();
  if remove_step(&mut next, name) {
    debug!(flow_version_id = %flow.id, step = %name, "action_deleted");
  }
  Ok(next)
}

/// Move a step directly after `target`.
///
/// Moving a step to its current parent keeps it in the slot it already
/// occupies, so a branch head stays at the head of its branch.
pub fn move_action(flow: &FlowVersion, name: &str, target: &str) -> Result<FlowVersion, GraphError> {
  let location = match location_of(flow, name)? {
    Some(current) if current.parent_step_name == target => current.location,
    _ => StepLocation::After,
  };
  move_action_at(flow, name, target, location)
}

/// Move a step, together with its branch contents, to `location` relative
/// to `target`.
pub fn move_action_at(
  flow: &FlowVersion,
  name: &str,
  target: &str,
  location: StepLocation,
) -> Result<FlowVersion, GraphError> {
  ensure_unlocked(flow)?;
  let found = find_by_name(flow, name)?;
  find_by_name(flow, target)?;

  if name == target {
    return match location {
      StepLocation::After => Ok(flow.clone()),
      StepLocation::InsideBranch { .. } => Err(GraphError::InvalidLocation {
        name: target.to_string(),
        message: "a step cannot be moved into its own branch".to_string(),
      }),
    };
  }
  if found.step.kind == StepKind::Trigger {
    return Err(GraphError::InvalidKind {
      name: name.to_string(),
      kind: found.step.kind,
    });
  }
  if branch_subtree(flow, found.step).any(|d| d.step.name == target) {
    return Err(GraphError::InvalidLocation {
      name: target.to_string(),
      message: format!("target is nested inside '{name}'"),
    });
  }

  let mut next = flow.clone();
  let step = detach_step(&mut next, name)?;
  insert_step(&mut next, target, location, step)?;

  debug!(
    flow_version_id = %flow.id,
    step = %name,
    target = %target,
    location = ?location,
    "action_moved"
  );
  Ok(next)
}

/// Insert a deep copy of a step (with its branch contents) directly after
/// it. Every copy gets a fresh name.
pub fn duplicate_action(flow: &FlowVersion, name: &str) -> Result<FlowVersion, GraphError> {
  ensure_unlocked(flow)?;
  let payload = ClipboardPayload::copy(flow, &[name])?;
  let location = PasteLocation {
    parent_step_name: name.to_string(),
    location: StepLocation::After,
  };
  let operations = paste_operations(&payload, flow, &location);
  let next = apply_operations(flow, &operations)?;

  debug!(flow_version_id = %flow.id, step = %name, copies = operations.len(), "action_duplicated");
  Ok(next)
}

/// Insert an empty branch into a router at `branch_index`.
pub fn add_branch(
  flow: &FlowVersion,
  router: &str,
  branch_index: usize,
  branch_name: &str,
) -> Result<FlowVersion, GraphError> {
  ensure_unlocked(flow)?;
  let found = find_by_name(flow, router)?;
  if found.step.kind != StepKind::Router {
    return Err(GraphError::InvalidKind {
      name: router.to_string(),
      kind: found.step.kind,
    });
  }
  let branches = &found.step.branches;
  if branch_index > branches.len() {
    return Err(GraphError::InvalidBranch {
      step: router.to_string(),
      message: format!("branch index {branch_index} is out of range"),
    });
  }
  if branches.iter().any(|b| b.branch_name == branch_name) {
    return Err(GraphError::InvalidBranch {
      step: router.to_string(),
      message: format!("branch '{branch_name}' already exists"),
    });
  }

  let mut next = flow.clone();
  if let Some(step) = next.get_step_mut(router) {
    step.branches.insert(branch_index, Branch::new(branch_name));
  }
  Ok(next)
}

/// Remove a router branch and every step in it. A router keeps at least
/// one branch.
pub fn delete_branch(
  flow: &FlowVersion,
  router: &str,
  branch_index: usize,
) -> Result<FlowVersion, GraphError> {
  ensure_unlocked(flow)?;
  let found = find_by_name(flow, router)?;
  if found.step.kind != StepKind::Router {
    return Err(GraphError::InvalidKind {
      name: router.to_string(),
      kind: found.step.kind,
    });
  }
  let branches = &found.step.branches;
  let Some(branch) = branches.get(branch_index) else {
    return Err(GraphError::InvalidBranch {
      step: router.to_string(),
      message: format!("branch index {branch_index} is out of range"),
    });
  };
  if branches.len() == 1 {
    return Err(GraphError::InvalidBranch {
      step: router.to_string(),
      message: "a router must keep at least one branch".to_string(),
    });
  }
  let doomed: Vec<String> = match branch.head.as_deref() {
    Some(head) => walk_from(flow, head)
      .map(|d| d.step.name.clone())
      .collect(),
    None => Vec::new(),
  };

  let mut next = flow.clone();
  for name in &doomed {
    next.steps.remove(name);
  }
  if let Some(step) = next.get_step_mut(router) {
    step.branches.remove(branch_index);
  }
  Ok(next)
}

/// Set or clear `skip` on every named step.
pub fn set_skip<S: AsRef<str>>(
  flow: &FlowVersion,
  names: &[S],
  skip: bool,
) -> Result<FlowVersion, GraphError> {
  ensure_unlocked(flow)?;
  for name in names {
    find_by_name(flow, name.as_ref())?;
  }

  let mut next = flow.clone();
  for name in names {
    if let Some(step) = next.get_step_mut(name.as_ref()) {
      step.skip = skip;
    }
  }
  Ok(next)
}

/// Rename the flow version's display name.
pub fn change_name(flow: &FlowVersion, display_name: &str) -> Result<FlowVersion, GraphError> {
  ensure_unlocked(flow)?;
  let mut next = flow.clone();
  next.display_name = display_name.to_string();
  Ok(next)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::navigation::{all_step_names, main_chain};
  use crate::validate::validate;
  use serde_json::json;
  use stepflow_config::FlowVersionState;

  fn names(flow: &FlowVersion) -> Vec<String> {
    all_step_names(flow)
  }

  /// trigger -> a -> b
  fn linear_flow() -> FlowVersion {
    FlowVersion::new("fv", Step::trigger("trigger", json!({})).with_next("a"))
      .with_step(Step::action("a", json!({ "n": 1 })).with_next("b"))
      .with_step(Step::action("b", json!({ "n": 2 })))
  }

  /// trigger -> router[yes: y1 -> y2, no: (empty)] -> end
  fn router_flow() -> FlowVersion {
    FlowVersion::new("fv", Step::trigger("trigger", json!({})).with_next("router"))
      .with_step(
        Step::router("router", json!({}), ["yes", "no"])
          .with_branch_head(0, "y1")
          .with_next("end"),
      )
      .with_step(Step::action("y1", json!({})).with_next("y2"))
      .with_step(Step::action("y2", json!({ "v": "{{y1.out}}" })))
      .with_step(Step::action("end", json!({})))
  }

  #[test]
  fn test_add_action_splices_after_anchor() {
    let flow = linear_flow();
    let next = add_action(&flow, "a", Step::action("c", json!({}))).unwrap();

    assert_eq!(names(&next), vec!["trigger", "a", "c", "b"]);
    assert_eq!(names(&flow), vec!["trigger", "a", "b"]);
    assert_eq!(validate(&next), Ok(()));
  }

  #[test]
  fn test_add_action_at_end_of_chain() {
    let next = add_action(&linear_flow(), "b", Step::action("c", json!({}))).unwrap();
    assert_eq!(names(&next), vec!["trigger", "a", "b", "c"]);
  }

  #[test]
  fn test_add_action_errors() {
    let flow = linear_flow();
    assert!(matches!(
      add_action(&flow, "missing", Step::action("c", json!({}))),
      Err(GraphError::NotFound { .. })
    ));
    assert!(matches!(
      add_action(&flow, "a", Step::action("b", json!({}))),
      Err(GraphError::DuplicateName { name }) if name == "b"
    ));
    assert!(matches!(
      add_action(&flow, "a", Step::trigger("t2", json!({}))),
      Err(GraphError::InvalidKind { .. })
    ));
  }

  #[test]
  fn test_add_action_discards_incoming_links() {
    let step = Step::action("c", json!({})).with_next("ghost");
    let next = add_action(&linear_flow(), "a", step).unwrap();
    assert_eq!(next.get_step("c").unwrap().next.as_deref(), Some("b"));
  }

  #[test]
  fn test_add_inside_branch() {
    let flow = router_flow();
    let next = add_action_at(
      &flow,
      "router",
      StepLocation::InsideBranch { branch_index: 0 },
      Step::action("y0", json!({})),
    )
    .unwrap();
    let router = next.get_step("router").unwrap();
    assert_eq!(router.branches[0].head.as_deref(), Some("y0"));
    assert_eq!(next.get_step("y0").unwrap().next.as_deref(), Some("y1"));

    let next = add_action_at(
      &next,
      "router",
      StepLocation::InsideBranch { branch_index: 1 },
      Step::action("n1", json!({})),
    )
    .unwrap();
    assert_eq!(
      next.get_step("router").unwrap().branches[1].head.as_deref(),
      Some("n1")
    );
    assert_eq!(validate(&next), Ok(()));

    assert!(matches!(
      add_action_at(
        &next,
        "router",
        StepLocation::InsideBranch { branch_index: 2 },
        Step::action("n2", json!({})),
      ),
      Err(GraphError::InvalidLocation { .. })
    ));
  }

  #[test]
  fn test_add_loop_gets_body_branch() {
    let step = Step::new("loop", StepKind::Loop, json!({}));
    let next = add_action(&linear_flow(), "a", step).unwrap();
    assert_eq!(next.get_step("loop").unwrap().branches.len(), 1);
    assert_eq!(validate(&next), Ok(()));
  }

  #[test]
  fn test_update_action_preserves_links() {
    let flow = linear_flow();
    let update = StepUpdate {
      name: "a".to_string(),
      display_name: "Send".to_string(),
      settings: json!({ "n": 10 }),
      skip: true,
      valid: false,
    };
    let next = update_action(&flow, update).unwrap();
    let a = next.get_step("a").unwrap();
    assert_eq!(a.settings, json!({ "n": 10 }));
    assert_eq!(a.display_name, "Send");
    assert!(a.skip);
    assert_eq!(a.next.as_deref(), Some("b"));
    assert_eq!(flow.get_step("a").unwrap().settings, json!({ "n": 1 }));
  }

  #[test]
  fn test_update_missing_action() {
    let update = StepUpdate::from(&Step::action("missing", json!({})));
    assert!(matches!(
      update_action(&linear_flow(), update),
      Err(GraphError::NotFound { .. })
    ));
  }

  #[test]
  fn test_delete_action_relinks_parent() {
    let next = delete_action(&linear_flow(), "a").unwrap();
    assert_eq!(names(&next), vec!["trigger", "b"]);
    assert!(!next.contains("a"));
  }

  #[test]
  fn test_delete_missing_action_is_noop() {
    let flow = linear_flow();
    let next = delete_action(&flow, "missing").unwrap();
    assert_eq!(next, flow);
  }

  #[test]
  fn test_delete_root_promotes_successor() {
    let next = delete_action(&linear_flow(), "trigger").unwrap();
    assert_eq!(next.trigger.as_deref(), Some("a"));

    let single = FlowVersion::new("fv", Step::trigger("trigger", json!({})));
    let empty = delete_action(&single, "trigger").unwrap();
    assert!(empty.is_empty());
    assert!(empty.steps.is_empty());
  }

  #[test]
  fn test_delete_router_removes_branch_contents() {
    let next = delete_action(&router_flow(), "router").unwrap();
    assert_eq!(names(&next), vec!["trigger", "end"]);
    assert_eq!(next.steps.len(), 2);
    assert_eq!(validate(&next), Ok(()));
  }

  #[test]
  fn test_delete_branch_head() {
    let next = delete_action(&router_flow(), "y1").unwrap();
    assert_eq!(
      next.get_step("router").unwrap().branches[0].head.as_deref(),
      Some("y2")
    );
  }

  #[test]
  fn test_add_then_delete_round_trip() {
    let flow = router_flow();
    let added = add_action(&flow, "y1", Step::action("z", json!({}))).unwrap();
    let restored = delete_action(&added, "z").unwrap();
    assert_eq!(restored, flow);
  }

  #[test]
  fn test_move_action() {
    let flow = FlowVersion::new("fv", Step::trigger("trigger", json!({})).with_next("a"))
      .with_step(Step::action("a", json!({})).with_next("b"))
      .with_step(Step::action("b", json!({})).with_next("c"))
      .with_step(Step::action("c", json!({})));

    let next = move_action(&flow, "a", "c").unwrap();
    assert_eq!(names(&next), vec!["trigger", "b", "c", "a"]);
    assert_eq!(validate(&next), Ok(()));
  }

  #[test]
  fn test_move_after_current_parent_is_noop() {
    let flow = linear_flow();
    assert_eq!(move_action(&flow, "b", "a").unwrap(), flow);
    assert_eq!(move_action(&flow, "a", "a").unwrap(), flow);
  }

  #[test]
  fn test_move_branch_head_to_its_router_is_noop() {
    let flow = router_flow();
    assert_eq!(move_action(&flow, "y1", "router").unwrap(), flow);
    assert_eq!(move_action(&flow, "y2", "y1").unwrap(), flow);
    assert_eq!(move_action(&flow, "end", "router").unwrap(), flow);
  }

  #[test]
  fn test_move_into_branch_and_out() {
    let flow = router_flow();
    let next = move_action_at(
      &flow,
      "end",
      "router",
      StepLocation::InsideBranch { branch_index: 1 },
    )
    .unwrap();
    assert!(next.get_step("router").unwrap().next.is_none());
    assert_eq!(
      next.get_step("router").unwrap().branches[1].head.as_deref(),
      Some("end")
    );

    let back = move_action(&next, "end", "router").unwrap();
    assert_eq!(back, flow);
  }

  #[test]
  fn test_move_router_keeps_branches() {
    let flow = router_flow();
    let next = move_action(&flow, "router", "end").unwrap();
    let chain: Vec<_> = main_chain(&next).iter().map(|s| s.name.clone()).collect();
    assert_eq!(chain, vec!["trigger", "end", "router"]);
    assert_eq!(
      next.get_step("router").unwrap().branches[0].head.as_deref(),
      Some("y1")
    );
    assert_eq!(validate(&next), Ok(()));
  }

  #[test]
  fn test_move_errors() {
    let flow = router_flow();
    assert!(matches!(
      move_action(&flow, "missing", "end"),
      Err(GraphError::NotFound { .. })
    ));
    assert!(matches!(
      move_action(&flow, "end", "missing"),
      Err(GraphError::NotFound { .. })
    ));
    assert!(matches!(
      move_action(&flow, "router", "y2"),
      Err(GraphError::InvalidLocation { .. })
    ));
    assert!(matches!(
      move_action(&flow, "trigger", "end"),
      Err(GraphError::InvalidKind { .. })
    ));
  }

  #[test]
  fn test_duplicate_action_gets_fresh_name() {
    let flow = linear_flow();
    let next = duplicate_action(&flow, "a").unwrap();

    assert_eq!(names(&next), vec!["trigger", "a", "step_1", "b"]);
    let copy = next.get_step("step_1").unwrap();
    assert_eq!(copy.kind, StepKind::Action);
    assert_eq!(copy.settings, json!({ "n": 1 }));
    assert_eq!(validate(&next), Ok(()));
  }

  #[test]
  fn test_duplicate_router_copies_subtree() {
    let flow = router_flow();
    let next = duplicate_action(&flow, "router").unwrap();

    assert_eq!(next.steps.len(), flow.steps.len() + 3);
    assert_eq!(validate(&next), Ok(()));

    let copy_name = next.get_step("router").unwrap().next.clone().unwrap();
    let copy = next.get_step(&copy_name).unwrap();
    assert_eq!(copy.kind, StepKind::Router);
    assert_eq!(copy.next.as_deref(), Some("end"));

    let copied_head = copy.branches[0].head.clone().unwrap();
    let copied_tail = next.get_step(&copied_head).unwrap().next.clone().unwrap();
    assert_eq!(
      next.get_step(&copied_tail).unwrap().settings,
      json!({ "v": format!("{{{{{copied_head}.out}}}}") })
    );
  }

  #[test]
  fn test_duplicate_trigger_rejected() {
    assert!(matches!(
      duplicate_action(&linear_flow(), "trigger"),
      Err(GraphError::InvalidKind { .. })
    ));
  }

  #[test]
  fn test_branch_management() {
    let flow = router_flow();
    let next = add_branch(&flow, "router", 1, "maybe").unwrap();
    let branch_names: Vec<_> = next
      .get_step("router")
      .unwrap()
      .branches
      .iter()
      .map(|b| b.branch_name.clone())
      .collect();
    assert_eq!(branch_names, vec!["yes", "maybe", "no"]);

    assert!(matches!(
      add_branch(&next, "router", 0, "yes"),
      Err(GraphError::InvalidBranch { .. })
    ));
    assert!(matches!(
      add_branch(&next, "end", 0, "x"),
      Err(GraphError::InvalidKind { .. })
    ));

    let next = delete_branch(&next, "router", 0).unwrap();
    assert!(!next.contains("y1"));
    assert!(!next.contains("y2"));
    assert_eq!(validate(&next), Ok(()));

    let next = delete_branch(&next, "router", 0).unwrap();
    assert!(matches!(
      delete_branch(&next, "router", 0),
      Err(GraphError::InvalidBranch { .. })
    ));
  }

  #[test]
  fn test_set_skip_and_change_name() {
    let flow = linear_flow();
    let next = set_skip(&flow, &["a", "b"], true).unwrap();
    assert!(next.get_step("a").unwrap().skip && next.get_step("b").unwrap().skip);
    assert!(set_skip(&flow, &["a", "missing"], true).is_err());

    let renamed = change_name(&flow, "Orders").unwrap();
    assert_eq!(renamed.display_name, "Orders");
  }

  #[test]
  fn test_locked_flow_rejects_edits() {
    let mut flow = linear_flow();
    flow.state = FlowVersionState::Locked;
    assert!(matches!(
      delete_action(&flow, "a"),
      Err(GraphError::FlowLocked { .. })
    ));
    assert!(matches!(
      add_action(&flow, "a", Step::action("c", json!({}))),
      Err(GraphError::FlowLocked { .. })
    ));
  }
}
