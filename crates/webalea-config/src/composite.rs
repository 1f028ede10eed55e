use serde::{Deserialize, Serialize};

use crate::graph::{Edge, GraphNode};
use crate::mapping::{Mapping, normalize_mappings};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositeGraph {
  #[serde(default)]
  pub nodes: Vec<GraphNode>,
  #[serde(default)]
  pub edges: Vec<Edge>,
}

/// An external value entering the composite through one of its input ports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositeInput {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub value: Option<serde_json::Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub default: Option<serde_json::Value>,
}

impl CompositeInput {
  pub fn value_or_default(&self) -> Option<serde_json::Value> {
    self.value.clone().or_else(|| self.default.clone())
  }

  /// Whether `key` names this input by id or by name.
  pub fn is_named(&self, key: &str) -> bool {
    self.id.as_deref() == Some(key) || self.name.as_deref() == Some(key)
  }
}

/// A declared output port of the composite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositeOutputDef {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
}

/// A graph of nodes and edges exposed as a single node.
///
/// `inputs_map` / `outputs_map` are kept as raw JSON because the editor has
/// emitted several entry shapes; use [`CompositeNode::input_mappings`] and
/// [`CompositeNode::output_mappings`] for the normalized form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositeNode {
  #[serde(default)]
  pub graph: CompositeGraph,
  #[serde(default)]
  pub inputs: Vec<CompositeInput>,
  #[serde(default)]
  pub outputs: Vec<CompositeOutputDef>,
  #[serde(
    default,
    alias = "input_map",
    alias = "inputs_mapping",
    alias = "input_mapping",
    skip_serializing_if = "Option::is_none"
  )]
  pub inputs_map: Option<serde_json::Value>,
  #[serde(
    default,
    alias = "output_map",
    alias = "outputs_mapping",
    alias = "output_mapping",
    skip_serializing_if = "Option::is_none"
  )]
  pub outputs_map: Option<serde_json::Value>,
}

impl CompositeNode {
  /// Normalized explicit input mappings, or `None` when absent or not a list.
  pub fn input_mappings(&self) -> Option<Vec<Mapping>> {
    mappings_from(self.inputs_map.as_ref())
  }

  /// Normalized explicit output mappings, or `None` when absent or not a list.
  pub fn output_mappings(&self) -> Option<Vec<Mapping>> {
    mappings_from(self.outputs_map.as_ref())
  }
}

fn mappings_from(raw: Option<&serde_json::Value>) -> Option<Vec<Mapping>> {
  raw
    .and_then(|value| value.as_array())
    .map(|items| normalize_mappings(items))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_mapping_aliases() {
    let composite: CompositeNode = serde_json::from_value(json!({
      "graph": {"nodes": [], "edges": []},
      "input_mapping": [{"source": "x", "target": "add:a"}],
      "output_map": [{"source": "add:result", "target": "sum"}]
    }))
    .unwrap();

    assert_eq!(composite.input_mappings().unwrap().len(), 1);
    assert_eq!(composite.output_mappings().unwrap().len(), 1);
  }

  #[test]
  fn test_non_list_mapping_is_ignored() {
    let composite: CompositeNode = serde_json::from_value(json!({
      "graph": {"nodes": []},
      "inputs_map": {"x": "add:a"}
    }))
    .unwrap();

    assert!(composite.input_mappings().is_none());
    assert!(composite.output_mappings().is_none());
  }

  #[test]
  fn test_input_value_falls_back_to_default() {
    let input: CompositeInput = serde_json::from_value(json!({
      "id": "ci_0",
      "name": "add_a",
      "default": 7
    }))
    .unwrap();

    assert!(input.is_named("ci_0"));
    assert!(input.is_named("add_a"));
    assert_eq!(input.value_or_default(), Some(json!(7)));
  }
}
