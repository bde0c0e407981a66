use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::enums::FlowVersionState;
use crate::step::Step;

/// A versioned snapshot of a workflow graph.
///
/// Steps live in a flat map keyed by name; `trigger` names the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowVersion {
  pub id: String,
  #[serde(default)]
  pub flow_id: String,
  #[serde(default)]
  pub display_name: String,
  /// Structural contract the data conforms to. Absent for graphs saved
  /// before schema versions were introduced.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub schema_version: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub trigger: Option<String>,
  #[serde(default)]
  pub steps: BTreeMap<String, Step>,
  #[serde(default)]
  pub valid: bool,
  #[serde(default)]
  pub state: FlowVersionState,
}

impl FlowVersion {
  /// Create a draft containing only the given trigger.
  pub fn new(id: impl Into<String>, trigger: Step) -> Self {
    let mut steps = BTreeMap::new();
    let root = trigger.name.clone();
    steps.insert(root.clone(), trigger);
    Self {
      id: id.into(),
      flow_id: String::new(),
      display_name: String::new(),
      schema_version: None,
      trigger: Some(root),
      steps,
      valid: false,
      state: FlowVersionState::Draft,
    }
  }

  pub fn with_schema_version(mut self, version: impl Into<String>) -> Self {
    self.schema_version = Some(version.into());
    self
  }

  pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
    self.display_name = display_name.into();
    self
  }

  /// Store a step as-is. Links are not checked; use the graph crate's
  /// mutation operations for edits that must keep the graph consistent.
  pub fn with_step(mut self, step: Step) -> Self {
    self.steps.insert(step.name.clone(), step);
    self
  }

  /// Get a step by name.
  pub fn get_step(&self, name: &str) -> Option<&Step> {
    self.steps.get(name)
  }

  pub fn get_step_mut(&mut self, name: &str) -> Option<&mut Step> {
    self.steps.get_mut(name)
  }

  /// The root step, if the graph is not empty.
  pub fn trigger_step(&self) -> Option<&Step> {
    self.trigger.as_deref().and_then(|name| self.steps.get(name))
  }

  pub fn contains(&self, name: &str) -> bool {
    self.steps.contains_key(name)
  }

  pub fn is_empty(&self) -> bool {
    self.trigger.is_none()
  }

  pub fn is_locked(&self) -> bool {
    self.state == FlowVersionState::Locked
  }
}
