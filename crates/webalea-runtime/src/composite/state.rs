use std::collections::HashMap;

use serde_json::Value as JsonValue;

/// What an input port of a pending node currently holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct InputState {
  pub received: bool,
  pub value: Option<JsonValue>,
  /// Position in the edge list of the edge that last wrote this port.
  pub edge: Option<usize>,
}

/// Input states of every custom node, keyed by node id then port id.
#[derive(Debug, Default)]
pub(crate) struct InputStates {
  nodes: HashMap<String, HashMap<String, InputState>>,
}

impl InputStates {
  pub fn insert_node(&mut self, node_id: &str, ports: HashMap<String, InputState>) {
    self.nodes.insert(node_id.to_string(), ports);
  }

  pub fn has_node(&self, node_id: &str) -> bool {
    self.nodes.contains_key(node_id)
  }

  pub fn get(&self, node_id: &str, port_id: &str) -> Option<&InputState> {
    self.nodes.get(node_id)?.get(port_id)
  }

  /// Node ids owning a port with this id.
  pub fn nodes_with_port(&self, port_id: &str) -> Vec<String> {
    let mut ids: Vec<String> = self
      .nodes
      .iter()
      .filter(|(_, ports)| ports.contains_key(port_id))
      .map(|(id, _)| id.clone())
      .collect();
    ids.sort();
    ids
  }

  /// Record a value for an existing port. Unknown nodes or ports are ignored.
  /// Returns whether a port was updated.
  pub fn set(&mut self, node_id: &str, port_id: &str, value: Option<JsonValue>) -> bool {
    match self.nodes.get_mut(node_id).and_then(|ports| ports.get_mut(port_id)) {
      Some(state) => {
        state.value = value;
        state.received = true;
        true
      }
      None => false,
    }
  }

  /// Record a value delivered by the edge at `edge_index`. A port already
  /// written by a later edge keeps its value, so edges resolve in list order
  /// whatever order their sources run in.
  pub fn set_from_edge(&mut self, node_id: &str, port_id: &str, edge_index: usize, value: Option<JsonValue>) -> bool {
    match self.nodes.get_mut(node_id).and_then(|ports| ports.get_mut(port_id)) {
      Some(state) if state.edge.is_none_or(|last| last <= edge_index) => {
        state.value = value;
        state.received = true;
        state.edge = Some(edge_index);
        true
      }
      _ => false,
    }
  }
}

/// Outputs of an executed node, addressable by port id, port name and
/// `output_<i>`. Keys keep first-insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct OutputTable {
  entries: Vec<(String, JsonValue)>,
}

impl OutputTable {
  pub fn insert(&mut self, key: impl Into<String>, value: JsonValue) {
    let key = key.into();
    match self.entries.iter_mut().find(|(k, _)| *k == key) {
      Some(entry) => entry.1 = value,
      None => self.entries.push((key, value)),
    }
  }

  pub fn get(&self, key: &str) -> Option<&JsonValue> {
    self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
  }

  pub fn first(&self) -> Option<&JsonValue> {
    self.entries.first().map(|(_, v)| v)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_output_table_replaces_in_place() {
    let mut table = OutputTable::default();
    table.insert("a", json!(1));
    table.insert("b", json!(2));
    table.insert("a", json!(3));
    assert_eq!(table.get("a"), Some(&json!(3)));
    assert_eq!(table.first(), Some(&json!(3)));
    assert_eq!(table.get("c"), None);
  }

  #[test]
  fn test_set_ignores_unknown_ports() {
    let mut states = InputStates::default();
    states.insert_node("n1", HashMap::from([("a".to_string(), InputState::default())]));

    assert!(states.set("n1", "a", Some(json!(5))));
    assert!(!states.set("n1", "b", Some(json!(5))));
    assert!(!states.set("n2", "a", Some(json!(5))));

    let state = states.get("n1", "a").unwrap();
    assert!(state.received);
    assert_eq!(state.value, Some(json!(5)));
    assert_eq!(states.nodes_with_port("a"), vec!["n1".to_string()]);
  }

  #[test]
  fn test_later_edge_wins() {
    let mut states = InputStates::default();
    states.insert_node("n1", HashMap::from([("a".to_string(), InputState::default())]));

    assert!(states.set_from_edge("n1", "a", 2, Some(json!("late"))));
    assert!(!states.set_from_edge("n1", "a", 0, Some(json!("early"))));
    assert_eq!(states.get("n1", "a").unwrap().value, Some(json!("late")));

    assert!(states.set_from_edge("n1", "a", 3, Some(json!("last"))));
    assert_eq!(states.get("n1", "a").unwrap().edge, Some(3));
    assert_eq!(states.get("n1", "a").unwrap().value, Some(json!("last")));
  }
}
