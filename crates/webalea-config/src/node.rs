use serde::{Deserialize, Serialize};

/// One input of a single-node execution request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInput {
  pub id: String,
  #[serde(default)]
  pub name: String,
  #[serde(rename = "type", default)]
  pub input_type: String,
  #[serde(default)]
  pub value: Option<serde_json::Value>,
}

/// A single executable unit: a package-provided node plus its inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
  #[serde(alias = "node_id")]
  pub id: String,
  pub package_name: String,
  pub node_name: String,
  #[serde(default)]
  pub inputs: Vec<NodeInput>,
}

impl NodeSpec {
  /// Inputs keyed by port name, falling back to the input id when unnamed.
  ///
  /// Later inputs with the same key win.
  pub fn input_values(&self) -> serde_json::Map<String, serde_json::Value> {
    self
      .inputs
      .iter()
      .map(|input| {
        let key = if input.name.is_empty() {
          input.id.clone()
        } else {
          input.name.clone()
        };
        (key, input.value.clone().unwrap_or(serde_json::Value::Null))
      })
      .collect()
  }
}
