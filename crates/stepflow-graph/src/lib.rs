//! Stepflow Graph
//!
//! Navigation, validation and structural editing of a [`FlowVersion`] step
//! graph.
//!
//! Every editing operation here is a pure function: it borrows the current
//! snapshot and returns a new one, so callers can keep the previous value for
//! undo or diffing. Editor requests can also be expressed as serializable
//! [`FlowOperation`]s and applied in batches.
//!
//! [`FlowVersion`]: stepflow_config::FlowVersion

mod bulk;
mod clipboard;
mod error;
mod graph;
mod mutation;
mod naming;
mod navigation;
mod operation;
mod validate;

pub use bulk::{BulkDeleteOutcome, bulk_delete, toggle_skip};
pub use clipboard::{
  ClipboardPayload, PasteLocation, PasteOutcome, default_paste_location, location_of, paste,
  paste_operations,
};
pub use error::{GraphError, ValidationError};
pub use graph::Graph;
pub use mutation::{
  StepLocation, StepUpdate, add_action, add_action_at, add_branch, change_name, delete_action,
  delete_branch, duplicate_action, move_action, move_action_at, set_skip, update_action,
};
pub use naming::{NameAllocator, rewrite_references};
pub use navigation::{
  LinkSlot, ParentLink, StepWithParent, Walk, all_step_names, chain_from, descendants,
  find_by_name, main_chain, successor, transform_steps, walk,
};
pub use operation::{FlowOperation, apply_operation, apply_operations};
pub use validate::{validate, violations};
