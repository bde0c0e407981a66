use stepflow_graph::ValidationError;
use thiserror::Error;

/// Errors raised while migrating a flow version.
#[derive(Debug, Error)]
pub enum MigrationError {
  /// A migration could not convert the data it was given.
  #[error("migration '{migration}' failed: {message}")]
  Failed { migration: String, message: String },

  /// A migration produced a graph that breaks the structural invariants.
  #[error("migration '{migration}' produced an invalid graph: {source}")]
  Integrity {
    migration: String,
    #[source]
    source: ValidationError,
  },

  /// A migration returned without moving the schema version forward.
  #[error("migration '{migration}' left schema version at {version:?}")]
  VersionNotAdvanced {
    migration: String,
    version: Option<String>,
  },

  /// The pipeline came back to a schema version it already migrated from.
  #[error("migration cycle at schema version {version:?}")]
  Cycle { version: Option<String> },
}

impl MigrationError {
  pub(crate) fn failed(migration: &str, message: impl Into<String>) -> Self {
    Self::Failed {
      migration: migration.to_string(),
      message: message.into(),
    }
  }
}

/// Errors raised while loading a persisted flow version.
#[derive(Debug, Error)]
pub enum LoadError {
  #[error("invalid flow version document: {0}")]
  Deserialize(#[from] serde_json::Error),

  #[error("flow version '{flow_version_id}' could not be migrated: {source}")]
  Migration {
    flow_version_id: String,
    #[source]
    source: MigrationError,
  },
}
