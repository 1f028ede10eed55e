use serde::{Deserialize, Serialize};

/// An input or output port declared on a graph node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortDef {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub value: Option<serde_json::Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub default: Option<serde_json::Value>,
}

impl PortDef {
  /// The port's current value, or its declared default.
  pub fn value_or_default(&self) -> Option<serde_json::Value> {
    self.value.clone().or_else(|| self.default.clone())
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub package_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub node_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub label: Option<String>,
  #[serde(default)]
  pub inputs: Vec<PortDef>,
  #[serde(default)]
  pub outputs: Vec<PortDef>,
}

/// A node within a composite graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
  pub id: String,
  #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
  pub node_type: Option<String>,
  #[serde(default)]
  pub data: NodeData,
}

impl GraphNode {
  /// A node is executable when it is explicitly `custom` or names both a
  /// package and a node. Anything else is a primitive value source.
  pub fn is_custom(&self) -> bool {
    let named = |field: &Option<String>| field.as_deref().is_some_and(|s| !s.is_empty());
    self.node_type.as_deref() == Some("custom")
      || (named(&self.data.package_name) && named(&self.data.node_name))
  }

  /// Whether `label` names this node, by node name or display label.
  pub fn matches_label(&self, label: &str) -> bool {
    self.data.node_name.as_deref() == Some(label) || self.data.label.as_deref() == Some(label)
  }
}

/// A directed connection from an output port of `source` to an input port of
/// `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
  pub source: String,
  pub target: String,
  #[serde(
    rename = "sourceHandle",
    alias = "source_handle",
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub source_handle: Option<String>,
  #[serde(
    rename = "targetHandle",
    alias = "target_handle",
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub target_handle: Option<String>,
}
