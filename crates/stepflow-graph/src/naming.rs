use std::collections::{HashMap, HashSet};

use stepflow_config::FlowVersion;

const STEP_NAME_PREFIX: &str = "step_";

/// Hands out `step_N` names that collide with nothing already taken.
#[derive(Debug, Clone)]
pub struct NameAllocator {
  taken: HashSet<String>,
}

impl NameAllocator {
  /// Start from every name stored in the flow, reachable or not.
  pub fn for_flow(flow: &FlowVersion) -> Self {
    Self {
      taken: flow.steps.keys().cloned().collect(),
    }
  }

  /// The smallest unused `step_N`, reserved so it is not handed out twice.
  pub fn allocate(&mut self) -> String {
    let name = (1..)
      .map(|n| format!("{STEP_NAME_PREFIX}{n}"))
      .find(|candidate| !self.taken.contains(candidate))
      .unwrap_or_default();
    self.taken.insert(name.clone());
    name
  }
}

/// Rewrite `{{name...}}` references to renamed steps anywhere in a settings
/// value. Object keys are left alone.
pub fn rewrite_references(value: &mut serde_json::Value, renames: &HashMap<String, String>) {
  if renames.is_empty() {
    return;
  }
  match value {
    serde_json::Value::String(text) => {
      if let Some(rewritten) = rewrite_expression(text, renames) {
        *text = rewritten;
      }
    }
    serde_json::Value::Array(items) => {
      for item in items {
        rewrite_references(item, renames);
      }
    }
    serde_json::Value::Object(map) => {
      for item in map.values_mut() {
        rewrite_references(item, renames);
      }
    }
    _ => {}
  }
}

/// Returns `None` when nothing in `text` refers to a renamed step.
fn rewrite_expression(text: &str, renames: &HashMap<String, String>) -> Option<String> {
  let mut out = String::with_capacity(text.len());
  let mut rest = text;
  let mut changed = false;

  while let Some(start) = rest.find("{{") {
    let (before, inside) = rest.split_at(start + 2);
    out.push_str(before);

    let trimmed = inside.trim_start();
    out.push_str(&inside[..inside.len() - trimmed.len()]);

    let ident_len = trimmed
      .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
      .unwrap_or(trimmed.len());
    let ident = &trimmed[..ident_len];
    match renames.get(ident) {
      Some(renamed) => {
        out.push_str(renamed);
        changed = true;
      }
      None => out.push_str(ident),
    }
    rest = &trimmed[ident_len..];
  }
  out.push_str(rest);

  changed.then_some(out)
}
