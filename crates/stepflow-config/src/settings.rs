//! Step settings payloads.
//!
//! Settings are opaque to the graph: only the execution runtime interprets
//! them. Migrations are the one exception, since they rewrite settings that
//! were saved in an older shape.
//!
//! # Examples
//!
//! ```json
//! {
//!   "connector_name": "@acme/slack",
//!   "connector_version": "0.4.1",
//!   "action_name": "send_message",
//!   "input": { "text": "New order {{trigger.body.id}}" }
//! }
//! ```
//!
//! Values in `input` may reference the output of earlier steps with
//! `{{step_name...}}` expressions. When steps are renamed (paste, duplicate)
//! those references are rewritten alongside.

use serde::{Deserialize, Serialize};

/// Opaque step configuration.
pub type StepSettings = serde_json::Value;

/// Reference to a connector package pinned in a step's settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorRef {
  /// Connector package name, e.g. "@acme/slack"
  pub name: String,

  /// Version or version range, e.g. "0.4.1" or "~0.4.0"
  pub version: String,
}

impl ConnectorRef {
  pub const NAME_KEY: &'static str = "connector_name";
  pub const VERSION_KEY: &'static str = "connector_version";

  /// Read the connector reference out of a settings object, if present.
  pub fn from_settings(settings: &StepSettings) -> Option<Self> {
    let name = settings.get(Self::NAME_KEY)?.as_str()?;
    let version = settings.get(Self::VERSION_KEY)?.as_str()?;
    Some(Self {
      name: name.to_string(),
      version: version.to_string(),
    })
  }

  /// Whether the version is an exact version rather than a range.
  pub fn is_pinned(&self) -> bool {
    !self.version.starts_with(['^', '~'])
  }

  /// The exact version this reference resolves to once the range operator
  /// is dropped.
  pub fn pinned_version(&self) -> &str {
    self.version.trim_start_matches(['^', '~'])
  }
}
