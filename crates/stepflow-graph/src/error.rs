use stepflow_config::StepKind;
use thiserror::Error;

/// Errors returned by navigation, mutation and clipboard operations.
///
/// All of these are recoverable: the editor re-syncs its view or asks the
/// user for different input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
  #[error("step not found: {name}")]
  NotFound { name: String },

  #[error("duplicate step name: {name}")]
  DuplicateName { name: String },

  #[error("malformed clipboard payload: {message}")]
  MalformedClipboardPayload { message: String },

  #[error("step '{name}' of kind {kind} is not allowed here")]
  InvalidKind { name: String, kind: StepKind },

  #[error("invalid location relative to '{name}': {message}")]
  InvalidLocation { name: String, message: String },

  #[error("invalid branch on '{step}': {message}")]
  InvalidBranch { step: String, message: String },

  #[error("flow version '{flow_version_id}' is locked")]
  FlowLocked { flow_version_id: String },
}

impl GraphError {
  pub(crate) fn not_found(name: &str) -> Self {
    GraphError::NotFound {
      name: name.to_string(),
    }
  }

  pub(crate) fn malformed(message: impl Into<String>) -> Self {
    GraphError::MalformedClipboardPayload {
      message: message.into(),
    }
  }
}

/// Structural invariant violations found by [`validate`](crate::validate).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("root step not found: {name}")]
  RootNotFound { name: String },

  #[error("step stored under '{key}' is named '{name}'")]
  NameMismatch { key: String, name: String },

  #[error("link references unknown step: from={from}, to={to}")]
  DanglingLink { from: String, to: String },

  #[error("step '{name}' has more than one incoming link")]
  MultipleParents { name: String },

  #[error("cycle detected: root step '{name}' has an incoming link")]
  CycleDetected { name: String },

  #[error("step '{name}' is not reachable from the root")]
  Unreachable { name: String },

  #[error("trigger step '{name}' is not the root")]
  MisplacedTrigger { name: String },

  #[error("invalid branches on step '{name}': {message}")]
  InvalidBranches { name: String, message: String },
}
