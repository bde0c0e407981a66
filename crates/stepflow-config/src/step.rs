use serde::{Deserialize, Serialize};

use crate::branch::Branch;
use crate::enums::StepKind;
use crate::settings::StepSettings;

/// Name of the branch that holds a loop's body.
pub const LOOP_BODY_BRANCH: &str = "loop";

/// A node of the step graph.
///
/// Links to other steps are name references into the owning
/// [`FlowVersion`](crate::FlowVersion)'s step map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
  pub name: String,
  #[serde(default)]
  pub display_name: String,
  pub kind: StepKind,
  #[serde(default)]
  pub settings: StepSettings,
  #[serde(default)]
  pub skip: bool,
  #[serde(default = "default_valid")]
  pub valid: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub next: Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub branches: Vec<Branch>,
}

fn default_valid() -> bool {
  true
}

impl Step {
  pub fn new(name: impl Into<String>, kind: StepKind, settings: StepSettings) -> Self {
    let name = name.into();
    Self {
      display_name: name.clone(),
      name,
      kind,
      settings,
      skip: false,
      valid: true,
      next: None,
      branches: Vec::new(),
    }
  }

  pub fn trigger(name: impl Into<String>, settings: StepSettings) -> Self {
    Self::new(name, StepKind::Trigger, settings)
  }

  pub fn action(name: impl Into<String>, settings: StepSettings) -> Self {
    Self::new(name, StepKind::Action, settings)
  }

  /// A router with one empty branch per name.
  pub fn router<I, S>(name: impl Into<String>, settings: StepSettings, branch_names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let mut step = Self::new(name, StepKind::Router, settings);
    step.branches = branch_names.into_iter().map(Branch::new).collect();
    step
  }

  /// A loop with an empty body.
  pub fn loop_over(name: impl Into<String>, settings: StepSettings) -> Self {
    let mut step = Self::new(name, StepKind::Loop, settings);
    step.branches = vec![Branch::new(LOOP_BODY_BRANCH)];
    step
  }

  pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
    self.display_name = display_name.into();
    self
  }

  pub fn with_next(mut self, next: impl Into<String>) -> Self {
    self.next = Some(next.into());
    self
  }

  pub fn with_skip(mut self, skip: bool) -> Self {
    self.skip = skip;
    self
  }

  /// Set the head of the branch at `index`. Out-of-range indices are ignored.
  pub fn with_branch_head(mut self, index: usize, head: impl Into<String>) -> Self {
    if let Some(branch) = self.branches.get_mut(index) {
      branch.head = Some(head.into());
    }
    self
  }

  /// Every step this step links to: branch heads in order, then `next`.
  pub fn successors(&self) -> impl Iterator<Item = &str> {
    self
      .branches
      .iter()
      .filter_map(|b| b.head.as_deref())
      .chain(self.next.as_deref())
  }

  /// Clear every outgoing link while keeping the branch layout.
  pub fn detached(mut self) -> Self {
    self.next = None;
    for branch in &mut self.branches {
      branch.head = None;
    }
    self
  }
}
