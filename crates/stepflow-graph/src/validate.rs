use std::collections::HashSet;

use stepflow_config::{FlowVersion, StepKind};

use crate::error::ValidationError;
use crate::graph::Graph;
use crate::navigation::walk;

/// Check the structural invariants of a flow version.
///
/// This covers the shape only: single root, unique names, resolved links,
/// at most one parent per step, full reachability, and per-kind branch
/// layout. Settings are not inspected. Returns the first violation found by
/// [`violations`].
pub fn validate(flow: &FlowVersion) -> Result<(), ValidationError> {
  match violations(flow).into_iter().next() {
    Some(violation) => Err(violation),
    None => Ok(()),
  }
}

/// Every structural violation in a flow version, in check order.
pub fn violations(flow: &FlowVersion) -> Vec<ValidationError> {
  let mut found = Vec::new();

  for (key, step) in &flow.steps {
    if *key != step.name {
      found.push(ValidationError::NameMismatch {
        key: key.clone(),
        name: step.name.clone(),
      });
    }
  }

  let graph = Graph::new(flow);
  for (from, to) in graph.dangling_links() {
    found.push(ValidationError::DanglingLink { from, to });
  }

  for name in flow.steps.keys() {
    if graph.upstream(name).len() > 1 {
      found.push(ValidationError::MultipleParents { name: name.clone() });
    }
  }

  let Some(root) = flow.trigger.as_deref() else {
    for name in flow.steps.keys() {
      found.push(ValidationError::Unreachable { name: name.clone() });
    }
    return found;
  };

  if !flow.contains(root) {
    found.push(ValidationError::RootNotFound {
      name: root.to_string(),
    });
  } else {
    if !graph.upstream(root).is_empty() {
      found.push(ValidationError::CycleDetected {
        name: root.to_string(),
      });
    }
    let reachable: HashSet<&str> = walk(flow).map(|visit| visit.step.name.as_str()).collect();
    for name in flow.steps.keys() {
      if !reachable.contains(name.as_str()) {
        found.push(ValidationError::Unreachable { name: name.clone() });
      }
    }
  }

  for step in flow.steps.values() {
    if step.kind == StepKind::Trigger && step.name != root {
      found.push(ValidationError::MisplacedTrigger {
        name: step.name.clone(),
      });
    }
    if let Err(violation) = validate_branches(step) {
      found.push(violation);
    }
  }

  found
}

fn validate_branches(step: &stepflow_config::Step) -> Result<(), ValidationError> {
  let invalid = |message: &str| ValidationError::InvalidBranches {
    name: step.name.clone(),
    message: message.to_string(),
  };

  match step.kind {
    kind if !kind.is_branching() && !step.branches.is_empty() => {
      return Err(invalid("only routers and loops may have branches"));
    }
    StepKind::Loop if step.branches.len() != 1 => {
      return Err(invalid("a loop must have exactly one branch"));
    }
    StepKind::Router | StepKind::Branch if step.branches.is_empty() => {
      return Err(invalid("a router must have at least one branch"));
    }
    _ => {}
  }

  let mut names = HashSet::new();
  for branch in &step.branches {
    if !names.insert(branch.branch_name.as_str()) {
      return Err(invalid(&format!(
        "duplicate branch name '{}'",
        branch.branch_name
      )));
    }
  }
  Ok(())
}
