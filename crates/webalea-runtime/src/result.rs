use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// One output port of an executed node or composite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeOutput {
  pub index: usize,
  pub name: String,
  /// JSON-safe value, possibly a reference marker.
  pub value: JsonValue,
  #[serde(rename = "type")]
  pub value_type: String,
}

/// Structured outcome of a node or composite execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
  #[serde(default)]
  pub success: bool,
  #[serde(default)]
  pub outputs: Vec<NodeOutput>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  /// Non-fatal diagnostics, such as inputs that could not be applied.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub warnings: Vec<String>,
}

impl ExecutionResult {
  pub fn success(outputs: Vec<NodeOutput>) -> Self {
    Self {
      success: true,
      outputs,
      ..Default::default()
    }
  }

  pub fn failure(error: impl Into<String>) -> Self {
    Self {
      success: false,
      error: Some(error.into()),
      ..Default::default()
    }
  }

  pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
    self.warnings = warnings;
    self
  }

  /// The error message of a failed result.
  pub fn error_message(&self) -> String {
    self
      .error
      .clone()
      .unwrap_or_else(|| "Node execution failed".to_string())
  }
}

/// Type name reported for a plain JSON value.
pub fn json_type_name(value: &JsonValue) -> &'static str {
  match value {
    JsonValue::Null => "None",
    JsonValue::Bool(_) => "boolean",
    JsonValue::Number(n) if n.is_f64() => "float",
    JsonValue::Number(_) => "int",
    JsonValue::String(_) => "str",
    JsonValue::Array(_) => "list",
    JsonValue::Object(_) => "dict",
  }
}
