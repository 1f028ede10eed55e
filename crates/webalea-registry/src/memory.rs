use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;
use webalea_value::Value;

use crate::error::RegistryError;
use crate::port::PortDescriptor;
use crate::registry::{InputKey, Node, NodeFactory, NodeRegistry, Package};

/// Node body: current input values in, output values out.
pub type NodeFn = Arc<dyn Fn(&[Value]) -> Result<Vec<Value>, RegistryError> + Send + Sync>;

/// A node factory backed by a plain function.
///
/// Port declarations are kept in their raw JSON form and parsed on demand,
/// like metadata read from an installed package.
#[derive(Clone)]
pub struct SimpleFactory {
  name: String,
  description: String,
  inputs: JsonValue,
  outputs: JsonValue,
  func: NodeFn,
}

impl SimpleFactory {
  pub fn new<F>(name: impl Into<String>, func: F) -> Self
  where
    F: Fn(&[Value]) -> Result<Vec<Value>, RegistryError> + Send + Sync + 'static,
  {
    Self {
      name: name.into(),
      description: String::new(),
      inputs: JsonValue::Array(Vec::new()),
      outputs: JsonValue::Array(Vec::new()),
      func: Arc::new(func),
    }
  }

  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = description.into();
    self
  }

  pub fn with_inputs(mut self, inputs: JsonValue) -> Self {
    self.inputs = inputs;
    self
  }

  pub fn with_outputs(mut self, outputs: JsonValue) -> Self {
    self.outputs = outputs;
    self
  }
}

impl NodeFactory for SimpleFactory {
  fn name(&self) -> &str {
    &self.name
  }

  fn description(&self) -> &str {
    &self.description
  }

  fn inputs(&self) -> Vec<PortDescriptor> {
    PortDescriptor::list_from_json(&self.inputs)
  }

  fn outputs(&self) -> Vec<PortDescriptor> {
    PortDescriptor::list_from_json(&self.outputs)
  }

  fn instantiate(&self) -> Result<Box<dyn Node>, RegistryError> {
    let ports = self.inputs();
    let values = ports
      .iter()
      .map(|port| port.default.clone().map(Value::from).unwrap_or(Value::None))
      .collect();
    Ok(Box::new(SimpleNode {
      ports,
      values,
      func: self.func.clone(),
      outputs: Vec::new(),
    }))
  }
}

struct SimpleNode {
  ports: Vec<PortDescriptor>,
  values: Vec<Value>,
  func: NodeFn,
  outputs: Vec<Value>,
}

impl SimpleNode {
  fn port_index(&self, key: &InputKey) -> Result<usize, RegistryError> {
    match key {
      InputKey::Index(index) if *index < self.ports.len() => Ok(*index),
      InputKey::Index(index) => Err(RegistryError::InputOutOfRange {
        index: *index,
        count: self.ports.len(),
      }),
      InputKey::Name(name) => self
        .ports
        .iter()
        .position(|port| port.name() == Some(name.as_str()))
        .ok_or_else(|| RegistryError::UnknownInput(name.clone())),
    }
  }
}

impl Node for SimpleNode {
  fn set_input(&mut self, key: &InputKey, value: Value) -> Result<(), RegistryError> {
    let index = self.port_index(key)?;
    check_interface(&self.ports[index], key, &value)?;
    self.values[index] = value;
    Ok(())
  }

  fn eval(&mut self) -> Result<(), RegistryError> {
    self.outputs = (self.func)(&self.values)?;
    Ok(())
  }

  fn outputs(&self) -> Vec<Value> {
    self.outputs.clone()
  }
}

/// Reject values that cannot satisfy a port's declared interface.
/// `None` always passes and clears the port.
fn check_interface(port: &PortDescriptor, key: &InputKey, value: &Value) -> Result<(), RegistryError> {
  let accepted = match port.interface.as_deref() {
    Some("IInt") => matches!(value, Value::Int(_)),
    Some("IFloat") => matches!(value, Value::Int(_) | Value::Float(_)),
    Some("IStr") => matches!(value, Value::Str(_)),
    Some("IBool") => matches!(value, Value::Bool(_)),
    Some("ISequence") => matches!(value, Value::List(_) | Value::Tuple(_) | Value::Array(_)),
    _ => true,
  };
  if accepted || value.is_none() {
    return Ok(());
  }
  Err(RegistryError::InvalidInput {
    port: port.name().map(str::to_string).unwrap_or_else(|| key.to_string()),
    expected: port.interface.clone().unwrap_or_default(),
    actual: value.type_name(),
  })
}

/// A package whose factories live in memory.
#[derive(Clone, Default)]
pub struct MemoryPackage {
  name: String,
  factories: BTreeMap<String, SimpleFactory>,
}

impl MemoryPackage {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      factories: BTreeMap::new(),
    }
  }

  pub fn with_node(mut self, factory: SimpleFactory) -> Self {
    self.factories.insert(factory.name.clone(), factory);
    self
  }
}

impl Package for MemoryPackage {
  fn name(&self) -> &str {
    &self.name
  }

  fn node_names(&self) -> Vec<String> {
    self.factories.keys().cloned().collect()
  }

  fn get(&self, node_name: &str) -> Option<&dyn NodeFactory> {
    self
      .factories
      .get(node_name)
      .map(|factory| factory as &dyn NodeFactory)
  }
}

/// A registry assembled in memory from [`MemoryPackage`]s.
#[derive(Clone, Default)]
pub struct MemoryRegistry {
  packages: BTreeMap<String, MemoryPackage>,
}

impl MemoryRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_package(mut self, package: MemoryPackage) -> Self {
    self.packages.insert(package.name.clone(), package);
    self
  }
}

impl NodeRegistry for MemoryRegistry {
  fn package_keys(&self) -> Vec<String> {
    self.packages.keys().cloned().collect()
  }

  fn get_package(&self, name: &str) -> Option<&dyn Package> {
    self
      .packages
      .get(name)
      .map(|package| package as &dyn Package)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn echo_factory() -> SimpleFactory {
    SimpleFactory::new("echo", |inputs| Ok(inputs.to_vec()))
      .with_inputs(json!([
        {"name": "count", "interface": "IInt", "value": 1},
        "label",
      ]))
      .with_outputs(json!(["count", "label"]))
  }

  #[test]
  fn test_defaults_seed_inputs() {
    let mut node = echo_factory().instantiate().unwrap();
    node.eval().unwrap();
    assert_eq!(node.outputs(), vec![Value::Int(1), Value::None]);
  }

  #[test]
  fn test_set_input_by_index_and_name() {
    let mut node = echo_factory().instantiate().unwrap();
    node.set_input(&InputKey::Index(0), Value::Int(4)).unwrap();
    node
      .set_input(&InputKey::Name("label".to_string()), Value::from("x"))
      .unwrap();
    node.eval().unwrap();
    assert_eq!(node.outputs(), vec![Value::Int(4), Value::from("x")]);
  }

  #[test]
  fn test_set_input_rejections() {
    let mut node = echo_factory().instantiate().unwrap();

    let err = node
      .set_input(&InputKey::Name("missing".to_string()), Value::Int(1))
      .unwrap_err();
    assert_eq!(err, RegistryError::UnknownInput("missing".to_string()));

    let err = node.set_input(&InputKey::Index(5), Value::Int(1)).unwrap_err();
    assert_eq!(err, RegistryError::InputOutOfRange { index: 5, count: 2 });

    let err = node.set_input(&InputKey::Index(0), Value::from("many")).unwrap_err();
    assert!(matches!(err, RegistryError::InvalidInput { ref port, .. } if port == "count"));

    node.set_input(&InputKey::Index(0), Value::None).unwrap();
  }

  #[test]
  fn test_registry_lookup() {
    let registry = MemoryRegistry::new().with_package(MemoryPackage::new("demo").with_node(echo_factory()));
    assert_eq!(registry.package_keys(), vec!["demo".to_string()]);

    let package = registry.get_package("demo").unwrap();
    assert_eq!(package.node_names(), vec!["echo".to_string()]);
    assert!(package.get("echo").is_some());
    assert!(package.get("nope").is_none());
    assert!(registry.get_package("other").is_none());
  }
}
