//! Copy and paste of step subgraphs.
//!
//! The clipboard is a user-controlled channel, so a payload read back from
//! it is checked for its tag and shape before anything is built from it.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use stepflow_config::{FlowVersion, Step, StepKind};
use tracing::warn;

use crate::error::GraphError;
use crate::mutation::{StepLocation, check_branch_layout};
use crate::naming::{NameAllocator, rewrite_references};
use crate::navigation::{LinkSlot, branch_subtree, find_by_name, main_chain, walk};
use crate::operation::FlowOperation;

/// Copied steps, serialized as `{"type": "COPY_ACTIONS", "steps": [...]}`.
///
/// `steps[0]` heads the copied chain. Top-level copies are chained through
/// `next` in selection order; steps nested in their branches follow them in
/// the list with their links intact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClipboardPayload {
  #[serde(rename = "COPY_ACTIONS")]
  CopyActions { steps: Vec<Step> },
}

/// Where pasted steps go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasteLocation {
  pub parent_step_name: String,
  #[serde(default)]
  pub location: StepLocation,
}

/// Result of a paste request.
#[derive(Debug, Clone, PartialEq)]
pub enum PasteOutcome {
  /// Insert operations to apply in order.
  Operations(Vec<FlowOperation>),
  /// The clipboard did not hold a usable payload.
  NothingToPaste,
}

impl ClipboardPayload {
  /// Copy the selected steps out of a flow.
  ///
  /// Selection order does not matter: copies follow graph order. A selected
  /// step nested inside another selected step travels with its ancestor.
  pub fn copy<S: AsRef<str>>(flow: &FlowVersion, selected: &[S]) -> Result<Self, GraphError> {
    let mut roots = Vec::new();
    for name in selected {
      let found = find_by_name(flow, name.as_ref())?;
      if found.step.kind == StepKind::Trigger {
        return Err(GraphError::InvalidKind {
          name: found.step.name.clone(),
          kind: found.step.kind,
        });
      }
      roots.push(found.step);
    }

    let nested: HashSet<&str> = roots
      .iter()
      .flat_map(|step| branch_subtree(flow, *step).map(|d| d.step.name.as_str()))
      .collect();
    let order: HashMap<&str, usize> = walk(flow)
      .enumerate()
      .map(|(index, found)| (found.step.name.as_str(), index))
      .collect();

    roots.retain(|step| !nested.contains(step.name.as_str()));
    roots.sort_by_key(|step| order.get(step.name.as_str()).copied().unwrap_or(usize::MAX));
    roots.dedup_by(|a, b| a.name == b.name);

    let mut steps = Vec::new();
    for (index, root) in roots.iter().enumerate() {
      let mut copy = (*root).clone();
      copy.next = roots.get(index + 1).map(|next| next.name.clone());
      steps.push(copy);
      steps.extend(branch_subtree(flow, *root).map(|d| d.step.clone()));
    }

    Ok(ClipboardPayload::CopyActions { steps })
  }

  /// Parse and check a payload read back from the clipboard.
  pub fn parse(raw: &str) -> Result<Self, GraphError> {
    let payload: ClipboardPayload =
      serde_json::from_str(raw).map_err(|e| GraphError::malformed(e.to_string()))?;
    payload.check_shape()?;
    Ok(payload)
  }

  pub fn steps(&self) -> &[Step] {
    match self {
      ClipboardPayload::CopyActions { steps } => steps,
    }
  }

  /// Names unique, every link inside the payload, everything reachable from
  /// the head exactly once. Only insertable kinds with a valid branch layout.
  fn check_shape(&self) -> Result<(), GraphError> {
    let steps = self.steps();
    let Some(head) = steps.first() else {
      return Err(GraphError::malformed("payload contains no steps"));
    };

    let mut by_name: HashMap<&str, &Step> = HashMap::new();
    for step in steps {
      if !step.kind.is_insertable() {
        return Err(GraphError::malformed(format!(
          "step '{}' of kind '{}' cannot be pasted",
          step.name, step.kind
        )));
      }
      check_branch_layout(step).map_err(|err| GraphError::malformed(err.to_string()))?;
      if by_name.insert(step.name.as_str(), step).is_some() {
        return Err(GraphError::malformed(format!(
          "duplicate step name '{}'",
          step.name
        )));
      }
    }

    let mut visited = HashSet::new();
    let mut stack = vec![head.name.as_str()];
    while let Some(name) = stack.pop() {
      let step = by_name
        .get(name)
        .copied()
        .ok_or_else(|| GraphError::malformed(format!("link to unknown step '{name}'")))?;
      if !visited.insert(name) {
        return Err(GraphError::malformed(format!(
          "step '{name}' is linked more than once"
        )));
      }
      stack.extend(step.successors());
    }

    if visited.len() != steps.len() {
      return Err(GraphError::malformed("payload contains unlinked steps"));
    }
    Ok(())
  }
}

/// Plan the insert operations that splice a payload into `flow` at
/// `location`.
///
/// Copies get fresh names that collide with nothing in `flow`, and
/// `{{name...}}` references between copied steps are rewritten to match.
/// The plan is meant to be applied to the same `flow` it was computed for.
pub fn paste_operations(
  payload: &ClipboardPayload,
  flow: &FlowVersion,
  location: &PasteLocation,
) -> Vec<FlowOperation> {
  let steps = payload.steps();
  let Some(head) = steps.first() else {
    return Vec::new();
  };

  let mut names = NameAllocator::for_flow(flow);
  let renames: HashMap<String, String> = steps
    .iter()
    .map(|step| (step.name.clone(), names.allocate()))
    .collect();
  let by_name: HashMap<&str, &Step> = steps.iter().map(|s| (s.name.as_str(), s)).collect();

  let mut operations = Vec::with_capacity(steps.len());
  let mut stack = vec![(
    head.name.as_str(),
    location.parent_step_name.clone(),
    location.location,
  )];
  while let Some((name, parent_step, location)) = stack.pop() {
    let Some(step) = by_name.get(name).copied() else {
      continue;
    };
    let Some(new_name) = renames.get(name) else {
      continue;
    };

    if let Some(next) = step.next.as_deref() {
      stack.push((next, new_name.clone(), StepLocation::After));
    }
    for (index, branch) in step.branches.iter().enumerate().rev() {
      if let Some(branch_head) = branch.head.as_deref() {
        stack.push((
          branch_head,
          new_name.clone(),
          StepLocation::InsideBranch {
            branch_index: index,
          },
        ));
      }
    }

    let mut action = step.clone().detached();
    action.name = new_name.clone();
    rewrite_references(&mut action.settings, &renames);
    operations.push(FlowOperation::AddAction {
      parent_step,
      location,
      action,
    });
  }

  operations
}

/// Turn raw clipboard contents into insert operations.
///
/// Anything that is not a well-formed `COPY_ACTIONS` payload yields
/// [`PasteOutcome::NothingToPaste`]; this never fails.
pub fn paste(raw: &str, flow: &FlowVersion, location: &PasteLocation) -> PasteOutcome {
  match ClipboardPayload::parse(raw) {
    Ok(payload) => PasteOutcome::Operations(paste_operations(&payload, flow, location)),
    Err(e) => {
      warn!(flow_version_id = %flow.id, error = %e, "clipboard_payload_ignored");
      PasteOutcome::NothingToPaste
    }
  }
}

/// After the last step of the trigger's primary chain.
pub fn default_paste_location(flow: &FlowVersion) -> Option<PasteLocation> {
  main_chain(flow).last().map(|step| PasteLocation {
    parent_step_name: step.name.clone(),
    location: StepLocation::After,
  })
}

/// Where a step currently sits, expressed as a paste location.
pub fn location_of(flow: &FlowVersion, name: &str) -> Result<Option<PasteLocation>, GraphError> {
  let found = find_by_name(flow, name)?;
  Ok(found.parent.map(|link| PasteLocation {
    parent_step_name: link.step.name.clone(),
    location: match link.slot {
      LinkSlot::Next => StepLocation::After,
      LinkSlot::Branch(branch_index) => StepLocation::InsideBranch { branch_index },
    },
  }))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::navigation::all_step_names;
  use crate::operation::apply_operations;
  use crate::validate::validate;
  use serde_json::json;

  /// trigger -> a -> router[x: x1, y: (empty)] -> b
  fn flow() -> FlowVersion {
    FlowVersion::new("fv", Step::trigger("trigger", json!({})).with_next("a"))
      .with_step(Step::action("a", json!({ "n": "a" })).with_next("router"))
      .with_step(
        Step::router("router", json!({}), ["x", "y"])
          .with_branch_head(0, "x1")
          .with_next("b"),
      )
      .with_step(Step::action("x1", json!({ "from": "{{a.out}}" })))
      .with_step(Step::action("b", json!({ "n": "b" })))
  }

  fn payload_names(payload: &ClipboardPayload) -> Vec<&str> {
    payload.steps().iter().map(|s| s.name.as_str()).collect()
  }

  #[test]
  fn test_copy_orders_by_graph_and_chains() {
    let payload = ClipboardPayload::copy(&flow(), &["b", "a"]).unwrap();
    assert_eq!(payload_names(&payload), vec!["a", "b"]);
    assert_eq!(payload.steps()[0].next.as_deref(), Some("b"));
    assert!(payload.steps()[1].next.is_none());
  }

  #[test]
  fn test_copy_includes_branch_contents_once() {
    let payload = ClipboardPayload::copy(&flow(), &["x1", "router"]).unwrap();
    assert_eq!(payload_names(&payload), vec!["router", "x1"]);
    assert!(payload.steps()[0].next.is_none());
  }

  #[test]
  fn test_copy_errors() {
    assert!(matches!(
      ClipboardPayload::copy(&flow(), &["missing"]),
      Err(GraphError::NotFound { .. })
    ));
    assert!(matches!(
      ClipboardPayload::copy(&flow(), &["trigger"]),
      Err(GraphError::InvalidKind { .. })
    ));
  }

  #[test]
  fn test_payload_json_tag() {
    let payload = ClipboardPayload::copy(&flow(), &["b"]).unwrap();
    let value = serde_json::to_value(&payload).unwrap();
    assert_eq!(value["type"], "COPY_ACTIONS");
    assert_eq!(value["steps"][0]["name"], "b");
  }

  #[test]
  fn test_parse_rejects_bad_payloads() {
    let cases = [
      "not json",
      r#"{"type":"SOMETHING_ELSE","steps":[]}"#,
      r#"{"type":"COPY_ACTIONS","steps":[]}"#,
      r#"{"type":"COPY_ACTIONS","steps":[{"name":"a","kind":"action","next":"ghost"}]}"#,
      r#"{"type":"COPY_ACTIONS","steps":[{"name":"a","kind":"action"},{"name":"b","kind":"action"}]}"#,
      r#"{"type":"COPY_ACTIONS","steps":[{"name":"t","kind":"trigger"}]}"#,
      r#"{"type":"COPY_ACTIONS","steps":[{"name":"a","kind":"action","next":"a"}]}"#,
      r#"{"type":"COPY_ACTIONS","steps":[{"name":"a","kind":"action","branches":[{"branch_name":"x"}]}]}"#,
      r#"{"type":"COPY_ACTIONS","steps":[{"name":"l","kind":"loop","branches":[{"branch_name":"a"},{"branch_name":"b"}]}]}"#,
      r#"{"type":"COPY_ACTIONS","steps":[{"name":"r","kind":"router"}]}"#,
      r#"{"type":"COPY_ACTIONS","steps":[{"name":"r","kind":"router","branches":[{"branch_name":"x"},{"branch_name":"x"}]}]}"#,
      r#"{"type":"COPY_ACTIONS","steps":[{"name":"c","kind":"branch","branches":[{"branch_name":"true"}]}]}"#,
    ];
    for raw in cases {
      assert!(
        matches!(
          ClipboardPayload::parse(raw),
          Err(GraphError::MalformedClipboardPayload { .. })
        ),
        "accepted: {raw}"
      );
    }
  }

  #[test]
  fn test_paste_bad_branch_layout_is_nothing_to_paste() {
    let raw = r#"{"type":"COPY_ACTIONS","steps":[{"name":"a","kind":"action","branches":[{"branch_name":"x"}]}]}"#;
    let source = flow();
    let location = default_paste_location(&source).unwrap();
    assert_eq!(paste(raw, &source, &location), PasteOutcome::NothingToPaste);

    let bare_loop = r#"{"type":"COPY_ACTIONS","steps":[{"name":"l","kind":"loop"}]}"#;
    assert!(ClipboardPayload::parse(bare_loop).is_ok());
  }

  #[test]
  fn test_paste_after_location() {
    let source = flow();
    let payload = ClipboardPayload::copy(&source, &["a", "router"]).unwrap();
    let raw = serde_json::to_string(&payload).unwrap();

    let location = default_paste_location(&source).unwrap();
    assert_eq!(location.parent_step_name, "b");

    let PasteOutcome::Operations(operations) = paste(&raw, &source, &location) else {
      panic!("expected operations");
    };
    assert_eq!(operations.len(), 3);

    let pasted = apply_operations(&source, &operations).unwrap();
    assert_eq!(validate(&pasted), Ok(()));
    assert_eq!(
      all_step_names(&pasted),
      vec!["trigger", "a", "router", "x1", "b", "step_1", "step_2", "step_3"]
    );

    let copied_a = pasted.get_step("step_1").unwrap();
    assert_eq!(copied_a.settings, json!({ "n": "a" }));
    let copied_router = pasted.get_step("step_2").unwrap();
    assert_eq!(copied_router.kind, StepKind::Router);
    assert_eq!(copied_router.branches[0].head.as_deref(), Some("step_3"));
    assert_eq!(
      pasted.get_step("step_3").unwrap().settings,
      json!({ "from": "{{step_1.out}}" })
    );

    // source untouched
    assert_eq!(source, flow());
  }

  #[test]
  fn test_paste_inside_branch() {
    let source = flow();
    let payload = ClipboardPayload::copy(&source, &["b"]).unwrap();
    let raw = serde_json::to_string(&payload).unwrap();
    let location = PasteLocation {
      parent_step_name: "router".to_string(),
      location: StepLocation::InsideBranch { branch_index: 1 },
    };

    let PasteOutcome::Operations(operations) = paste(&raw, &source, &location) else {
      panic!("expected operations");
    };
    let pasted = apply_operations(&source, &operations).unwrap();
    assert_eq!(
      pasted.get_step("router").unwrap().branches[1].head.as_deref(),
      Some("step_1")
    );
  }

  #[test]
  fn test_paste_garbage_is_nothing() {
    let location = default_paste_location(&flow()).unwrap();
    assert_eq!(
      paste("{\"type\":\"OTHER\"}", &flow(), &location),
      PasteOutcome::NothingToPaste
    );
    assert_eq!(paste("", &flow(), &location), PasteOutcome::NothingToPaste);
  }

  #[test]
  fn test_default_paste_location_empty_flow() {
    let mut empty = flow();
    empty.trigger = None;
    empty.steps.clear();
    assert!(default_paste_location(&empty).is_none());
  }

  #[test]
  fn test_location_of() {
    let source = flow();
    assert!(location_of(&source, "trigger").unwrap().is_none());
    assert_eq!(
      location_of(&source, "x1").unwrap(),
      Some(PasteLocation {
        parent_step_name: "router".to_string(),
        location: StepLocation::InsideBranch { branch_index: 0 },
      })
    );
  }
}
