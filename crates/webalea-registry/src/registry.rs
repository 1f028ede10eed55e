use std::fmt;

use webalea_value::Value;

use crate::error::RegistryError;
use crate::port::PortDescriptor;

/// How a caller addresses an input port.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InputKey {
  Index(usize),
  Name(String),
}

impl InputKey {
  /// All-digit keys address a port by position, anything else by name.
  pub fn parse(key: &str) -> Self {
    if !key.is_empty() && key.chars().all(|c| c.is_ascii_digit()) {
      if let Ok(index) = key.parse() {
        return InputKey::Index(index);
      }
    }
    InputKey::Name(key.to_string())
  }
}

impl fmt::Display for InputKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      InputKey::Index(index) => write!(f, "{}", index),
      InputKey::Name(name) => write!(f, "{}", name),
    }
  }
}

/// Source of packages.
pub trait NodeRegistry: Send + Sync {
  /// Every package key the registry knows.
  fn package_keys(&self) -> Vec<String>;

  fn get_package(&self, name: &str) -> Option<&dyn Package>;
}

pub trait Package: Send + Sync {
  fn name(&self) -> &str;

  fn node_names(&self) -> Vec<String>;

  fn get(&self, node_name: &str) -> Option<&dyn NodeFactory>;
}

/// Describes a node and creates instances of it.
pub trait NodeFactory: Send + Sync {
  fn name(&self) -> &str;

  fn description(&self) -> &str {
    ""
  }

  fn inputs(&self) -> Vec<PortDescriptor>;

  fn outputs(&self) -> Vec<PortDescriptor>;

  fn instantiate(&self) -> Result<Box<dyn Node>, RegistryError>;
}

/// A live node instance.
pub trait Node: Send {
  fn set_input(&mut self, key: &InputKey, value: Value) -> Result<(), RegistryError>;

  /// Run the node. Blocking.
  fn eval(&mut self) -> Result<(), RegistryError>;

  /// Values produced by the last successful `eval`.
  fn outputs(&self) -> Vec<Value>;
}
