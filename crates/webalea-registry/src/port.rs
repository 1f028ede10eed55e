use serde::Serialize;
use serde_json::Value as JsonValue;

/// An input or output port as declared by a node factory.
///
/// Package metadata is not uniform: a port may be declared as a bare string,
/// as an object with `name`/`interface`/`value` (or `default`) keys, or as
/// something else entirely. Parsing never fails; unknown shapes produce a
/// descriptor with no name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PortDescriptor {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub interface: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub default: Option<JsonValue>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

impl PortDescriptor {
  pub fn named(name: impl Into<String>) -> Self {
    Self {
      name: Some(name.into()),
      ..Default::default()
    }
  }

  pub fn from_json(raw: &JsonValue) -> Self {
    match raw {
      JsonValue::String(name) => Self {
        name: non_empty(name),
        ..Default::default()
      },
      JsonValue::Object(fields) => Self {
        name: fields.get("name").and_then(text),
        interface: fields.get("interface").and_then(text),
        default: fields
          .get("value")
          .or_else(|| fields.get("default"))
          .filter(|v| !v.is_null())
          .cloned(),
        description: fields.get("desc").and_then(text),
      },
      _ => Self::default(),
    }
  }

  /// Parse a list of descriptors. Anything other than an array is treated as
  /// a single descriptor, `null` as none.
  pub fn list_from_json(raw: &JsonValue) -> Vec<Self> {
    match raw {
      JsonValue::Array(items) => items.iter().map(Self::from_json).collect(),
      JsonValue::Null => Vec::new(),
      other => vec![Self::from_json(other)],
    }
  }

  pub fn name(&self) -> Option<&str> {
    self.name.as_deref()
  }
}

fn non_empty(s: &str) -> Option<String> {
  if s.is_empty() {
    None
  } else {
    Some(s.to_string())
  }
}

/// Strings are taken as-is; other scalars are rendered.
fn text(raw: &JsonValue) -> Option<String> {
  match raw {
    JsonValue::String(s) => non_empty(s),
    JsonValue::Number(n) => Some(n.to_string()),
    JsonValue::Bool(b) => Some(b.to_string()),
    _ => None,
  }
}

/// Display name of output `index`, `output_<index>` when undeclared.
pub fn output_name(descriptors: &[PortDescriptor], index: usize) -> String {
  descriptors
    .get(index)
    .and_then(|d| d.name.clone())
    .unwrap_or_else(|| format!("output_{}", index))
}
