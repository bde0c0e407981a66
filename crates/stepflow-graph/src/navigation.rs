//! Read-only traversal of a step graph.
//!
//! Traversal starts at the root and follows both `next` links and every
//! branch head, so anything built on it works the same for steps nested in
//! routers and loops. It uses an explicit stack rather than recursion, and a
//! visited set so that corrupted input (shared or cyclic links) terminates.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use stepflow_config::{FlowVersion, Step};

use crate::error::GraphError;

/// Which outgoing link of a parent points at a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
pub enum LinkSlot {
  Next,
  Branch(usize),
}

/// The immediate parent of a step and the slot it is linked from.
#[derive(Debug, Clone, Copy)]
pub struct ParentLink<'a> {
  pub step: &'a Step,
  pub slot: LinkSlot,
}

/// A step found in the graph together with its parent (`None` for the root).
#[derive(Debug, Clone, Copy)]
pub struct StepWithParent<'a> {
  pub step: &'a Step,
  pub parent: Option<ParentLink<'a>>,
}

/// Depth-first walk over reachable steps: a step, then its branches in
/// order, then its successor.
pub struct Walk<'a> {
  flow: &'a FlowVersion,
  stack: Vec<(&'a str, Option<ParentLink<'a>>)>,
  visited: HashSet<&'a str>,
}

impl<'a> Walk<'a> {
  fn new(flow: &'a FlowVersion, heads: Vec<(&'a str, Option<ParentLink<'a>>)>) -> Self {
    let mut stack = heads;
    stack.reverse();
    Self {
      flow,
      stack,
      visited: HashSet::new(),
    }
  }
}

impl<'a> Iterator for Walk<'a> {
  type Item = StepWithParent<'a>;

  fn next(&mut self) -> Option<Self::Item> {
    while let Some((name, parent)) = self.stack.pop() {
      if !self.visited.insert(name) {
        continue;
      }
      let Some(step) = self.flow.steps.get(name) else {
        continue;
      };

      if let Some(next) = step.next.as_deref() {
        self.stack.push((
          next,
          Some(ParentLink {
            step,
            slot: LinkSlot::Next,
          }),
        ));
      }
      for (index, branch) in step.branches.iter().enumerate().rev() {
        if let Some(head) = branch.head.as_deref() {
          self.stack.push((
            head,
            Some(ParentLink {
              step,
              slot: LinkSlot::Branch(index),
            }),
          ));
        }
      }

      return Some(StepWithParent { step, parent });
    }
    None
  }
}

/// Walk every step reachable from the root.
pub fn walk(flow: &FlowVersion) -> Walk<'_> {
  let heads = flow
    .trigger
    .as_deref()
    .map(|root| vec![(root, None)])
    .unwrap_or_default();
  Walk::new(flow, heads)
}

/// Locate a reachable step by name together with its parent.
pub fn find_by_name<'a>(
  flow: &'a FlowVersion,
  name: &str,
) -> Result<StepWithParent<'a>, GraphError> {
  walk(flow)
    .find(|found| found.step.name == name)
    .ok_or_else(|| GraphError::not_found(name))
}

/// The step that runs after `name` on the same chain.
pub fn successor<'a>(flow: &'a FlowVersion, name: &str) -> Result<Option<&'a Step>, GraphError> {
  let found = find_by_name(flow, name)?;
  Ok(
    found
      .step
      .next
      .as_deref()
      .and_then(|next| flow.get_step(next)),
  )
}

/// Steps along a chain starting at `head`, following `next` links only.
pub fn chain_from<'a>(flow: &'a FlowVersion, head: &str) -> Vec<&'a Step> {
  let mut chain = Vec::new();
  let mut seen = HashSet::new();
  let mut current = flow.get_step(head);
  while let Some(step) = current {
    if !seen.insert(step.name.as_str()) {
      break;
    }
    chain.push(step);
    current = step.next.as_deref().and_then(|next| flow.get_step(next));
  }
  chain
}

/// Steps along the trigger's primary chain.
pub fn main_chain(flow: &FlowVersion) -> Vec<&Step> {
  match flow.trigger.as_deref() {
    Some(root) => chain_from(flow, root),
    None => Vec::new(),
  }
}

/// Every step nested inside the branches of `name`, in walk order.
pub fn descendants<'a>(flow: &'a FlowVersion, name: &str) -> Result<Vec<&'a Step>, GraphError> {
  let found = find_by_name(flow, name)?;
  Ok(branch_subtree(flow, found.step).map(|d| d.step).collect())
}

/// Walk the chain starting at `head` and everything nested below it.
pub(crate) fn walk_from<'a>(flow: &'a FlowVersion, head: &'a str) -> Walk<'a> {
  Walk::new(flow, vec![(head, None)])
}

pub(crate) fn branch_subtree<'a>(flow: &'a FlowVersion, step: &'a Step) -> Walk<'a> {
  let heads = step
    .branches
    .iter()
    .enumerate()
    .filter_map(|(index, branch)| {
      branch.head.as_deref().map(|head| {
        (
          head,
          Some(ParentLink {
            step,
            slot: LinkSlot::Branch(index),
          }),
        )
      })
    })
    .collect();
  Walk::new(flow, heads)
}

/// Names of every reachable step, in walk order.
pub fn all_step_names(flow: &FlowVersion) -> Vec<String> {
  walk(flow).map(|found| found.step.name.clone()).collect()
}

/// Clone the flow and apply `f` to every reachable step.
///
/// `f` must not rename steps or rewrite links; the graph is not re-linked
/// afterwards.
pub fn transform_steps<E, F>(flow: &FlowVersion, mut f: F) -> Result<FlowVersion, E>
where
  F: FnMut(&mut Step) -> Result<(), E>,
{
  let names = all_step_names(flow);
  let mut transformed = flow.clone();
  for name in names {
    if let Some(step) = transformed.steps.get_mut(&name) {
      f(step)?;
    }
  }
  Ok(transformed)
}
