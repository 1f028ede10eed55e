//! Composite boundary mappings.
//!
//! A mapping routes a composite-level port to a port of an internal node (for
//! inputs) or the other way round (for outputs). Entries arrive in several
//! shapes:
//!
//! ```json
//! {"source": "x", "target": "add:a"}
//! {"input": {"id": "x"}, "node_input": {"node_id": "add", "input_id": "a"}}
//! {"composite_input": "x", "target_input": {"label": "addition", "name": "a"}}
//! ```

use serde_json::Value;

const SOURCE_KEYS: [&str; 3] = ["source", "input", "composite_input"];
const TARGET_KEYS: [&str; 3] = ["target", "node_input", "target_input"];

/// Where a mapping points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingTarget {
  /// A bare string, either a composite port key or a `node:port` path.
  Path(String),
  /// A structured node/port reference.
  Port {
    node: Option<String>,
    input: Option<String>,
  },
}

impl MappingTarget {
  /// Split a `node:port` path. Structured targets are returned as-is.
  pub fn node_and_port(&self) -> Option<(&str, &str)> {
    match self {
      MappingTarget::Path(path) => path.split_once(':'),
      MappingTarget::Port {
        node: Some(node),
        input: Some(input),
      } if !input.is_empty() => Some((node.as_str(), input.as_str())),
      MappingTarget::Port { .. } => None,
    }
  }

  pub fn as_path(&self) -> Option<&str> {
    match self {
      MappingTarget::Path(path) => Some(path),
      MappingTarget::Port { .. } => None,
    }
  }
}

/// A normalized mapping entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
  pub source: Option<String>,
  pub target: Option<MappingTarget>,
}

impl Mapping {
  /// Normalize one raw entry. Returns `None` for anything that is not an
  /// object.
  pub fn from_json(item: &Value) -> Option<Self> {
    let object = item.as_object()?;

    let source = first_present(object, &SOURCE_KEYS).and_then(|value| match value {
      Value::Object(source) => first_string(source, &["id", "name"]),
      other => scalar_string(other),
    });

    let target = first_present(object, &TARGET_KEYS).and_then(|value| match value {
      Value::String(path) => Some(MappingTarget::Path(path.clone())),
      Value::Object(target) => Some(MappingTarget::Port {
        node: first_string(target, &["node_id", "node", "label"]),
        input: first_string(target, &["input_id", "input", "name"]),
      }),
      _ => None,
    });

    Some(Self { source, target })
  }
}

/// Normalize a list of raw mapping entries, skipping malformed ones.
pub fn normalize_mappings(items: &[Value]) -> Vec<Mapping> {
  items.iter().filter_map(Mapping::from_json).collect()
}

/// The first key whose value is present and non-empty.
fn first_present<'a>(object: &'a serde_json::Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
  keys
    .iter()
    .filter_map(|key| object.get(*key))
    .find(|value| !is_empty(value))
}

fn first_string(object: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<String> {
  first_present(object, keys).and_then(scalar_string)
}

fn scalar_string(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

fn is_empty(value: &Value) -> bool {
  match value {
    Value::Null => true,
    Value::Bool(b) => !b,
    Value::String(s) => s.is_empty(),
    Value::Array(a) => a.is_empty(),
    Value::Object(o) => o.is_empty(),
    Value::Number(_) => false,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_string_source_and_path_target() {
    let mapping = Mapping::from_json(&json!({"source": "x", "target": "add:a"})).unwrap();
    assert_eq!(mapping.source.as_deref(), Some("x"));
    assert_eq!(
      mapping.target.as_ref().and_then(|t| t.node_and_port()),
      Some(("add", "a"))
    );
  }

  #[test]
  fn test_structured_shapes() {
    let mapping = Mapping::from_json(&json!({
      "input": {"name": "x"},
      "node_input": {"label": "addition", "name": "a"}
    }))
    .unwrap();

    assert_eq!(mapping.source.as_deref(), Some("x"));
    assert_eq!(
      mapping.target,
      Some(MappingTarget::Port {
        node: Some("addition".to_string()),
        input: Some("a".to_string()),
      })
    );
  }

  #[test]
  fn test_empty_source_falls_through_to_alias() {
    let mapping = Mapping::from_json(&json!({
      "source": "",
      "composite_input": "y",
      "target_input": "n:b"
    }))
    .unwrap();
    assert_eq!(mapping.source.as_deref(), Some("y"));
    assert_eq!(mapping.target, Some(MappingTarget::Path("n:b".to_string())));
  }

  #[test]
  fn test_malformed_entries() {
    let mappings = normalize_mappings(&[
      json!("add:a"),
      json!(42),
      json!({"source": ["x"], "target": 3}),
      json!({"source": "x"}),
    ]);

    assert_eq!(mappings.len(), 2);
    assert_eq!(mappings[0].source, None);
    assert_eq!(mappings[0].target, None);
    assert_eq!(mappings[1].target, None);
  }

  #[test]
  fn test_path_without_separator() {
    let target = MappingTarget::Path("sum".to_string());
    assert_eq!(target.node_and_port(), None);
    assert_eq!(target.as_path(), Some("sum"));
  }
}
