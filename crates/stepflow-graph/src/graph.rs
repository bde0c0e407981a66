use std::collections::HashMap;

use stepflow_config::FlowVersion;

/// Link index over every stored step, reachable or not.
///
/// Navigation only sees what is reachable from the root; this index sees the
/// whole step map, which is what structural validation needs.
#[derive(Debug, Clone)]
pub struct Graph {
  /// Adjacency list: step name -> linked step names (branch heads, then next).
  adjacency: HashMap<String, Vec<String>>,
  /// Reverse adjacency: step name -> names of steps linking to it.
  reverse_adjacency: HashMap<String, Vec<String>>,
}

impl Graph {
  /// Build the index from a flow's step map.
  pub fn new(flow: &FlowVersion) -> Self {
    let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
    let mut reverse_adjacency: HashMap<String, Vec<String>> = HashMap::new();

    for name in flow.steps.keys() {
      adjacency.entry(name.clone()).or_default();
      reverse_adjacency.entry(name.clone()).or_default();
    }

    for (name, step) in &flow.steps {
      for target in step.successors() {
        adjacency
          .entry(name.clone())
          .or_default()
          .push(target.to_string());
        reverse_adjacency
          .entry(target.to_string())
          .or_default()
          .push(name.clone());
      }
    }

    Self {
      adjacency,
      reverse_adjacency,
    }
  }

  /// Steps linking to a given step.
  pub fn upstream(&self, name: &str) -> &[String] {
    self
      .reverse_adjacency
      .get(name)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Every link target that names no stored step, as `(from, to)` pairs.
  pub fn dangling_links(&self) -> Vec<(String, String)> {
    let mut dangling = Vec::new();
    for (from, targets) in &self.adjacency {
      for to in targets {
        if !self.adjacency.contains_key(to) {
          dangling.push((from.clone(), to.clone()));
        }
      }
    }
    dangling.sort();
    dangling
  }
}
