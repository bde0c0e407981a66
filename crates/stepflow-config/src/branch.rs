use serde::{Deserialize, Serialize};

/// A named outgoing edge of a router (or the body of a loop).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
  pub branch_name: String,
  /// First step of the branch chain. `None` for an empty branch.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub head: Option<String>,
}

impl Branch {
  pub fn new(branch_name: impl Into<String>) -> Self {
    Self {
      branch_name: branch_name.into(),
      head: None,
    }
  }
}
