use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
  Trigger,
  Action,
  Router,
  Loop,
  /// Two-way conditional from early schema versions. Only found in graphs
  /// that have not been migrated yet; superseded by [`StepKind::Router`].
  Branch,
}

impl StepKind {
  /// Whether steps of this kind own branches instead of only a `next` link.
  pub fn is_branching(self) -> bool {
    matches!(self, StepKind::Router | StepKind::Loop | StepKind::Branch)
  }

  /// Whether the editor may insert a new step of this kind.
  pub fn is_insertable(self) -> bool {
    matches!(self, StepKind::Action | StepKind::Router | StepKind::Loop)
  }
}

impl fmt::Display for StepKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      StepKind::Trigger => "trigger",
      StepKind::Action => "action",
      StepKind::Router => "router",
      StepKind::Loop => "loop",
      StepKind::Branch => "branch",
    };
    f.write_str(s)
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowVersionState {
  #[default]
  Draft,
  /// Published versions are immutable; edits go to a new draft.
  Locked,
}
