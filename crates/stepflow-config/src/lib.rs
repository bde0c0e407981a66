//! Stepflow Config
//!
//! This crate contains the serializable step graph types for stepflow.
//! A [`FlowVersion`] is one snapshot of a workflow: a flat map of [`Step`]s
//! keyed by name, with `next` and [`Branch`] links expressed as name
//! references and a `trigger` naming the root.
//!
//! Snapshots are stored verbatim (as JSON) by the persistence layer together
//! with their `schema_version` tag. Graphs saved at an older schema version
//! must go through `stepflow-migrations` before anything else reads them.

mod branch;
mod enums;
mod flow;
mod settings;
mod step;

pub use branch::Branch;
pub use enums::{FlowVersionState, StepKind};
pub use flow::FlowVersion;
pub use settings::{ConnectorRef, StepSettings};
pub use step::{LOOP_BODY_BRANCH, Step};
