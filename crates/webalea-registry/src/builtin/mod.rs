mod data;
mod math;
mod plantgl;

use webalea_value::Value;

use crate::memory::MemoryRegistry;
use crate::registry::{NodeRegistry, Package};

/// Registry preloaded with the `openalea.math`, `openalea.data` and
/// `openalea.plantgl` packages.
#[derive(Clone)]
pub struct BuiltinRegistry {
  inner: MemoryRegistry,
}

impl BuiltinRegistry {
  pub fn new() -> Self {
    let inner = MemoryRegistry::new()
      .with_package(math::package())
      .with_package(data::package())
      .with_package(plantgl::package());
    Self { inner }
  }
}

impl Default for BuiltinRegistry {
  fn default() -> Self {
    Self::new()
  }
}

impl NodeRegistry for BuiltinRegistry {
  fn package_keys(&self) -> Vec<String> {
    self.inner.package_keys()
  }

  fn get_package(&self, name: &str) -> Option<&dyn Package> {
    self.inner.get_package(name)
  }
}

static NONE: Value = Value::None;

/// Input at `index`, `None` past the end.
fn arg(inputs: &[Value], index: usize) -> &Value {
  inputs.get(index).unwrap_or(&NONE)
}

/// Numeric view of a value; ints widen to floats.
fn as_f64(value: &Value) -> Option<f64> {
  match value {
    Value::Int(i) => Some(*i as f64),
    Value::Float(x) => Some(*x),
    Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_builtin_packages() {
    let registry = BuiltinRegistry::new();
    assert_eq!(
      registry.package_keys(),
      vec!["openalea.data", "openalea.math", "openalea.plantgl"]
    );
    let math = registry.get_package("openalea.math").unwrap();
    assert!(math.get("addition").is_some());
  }
}
