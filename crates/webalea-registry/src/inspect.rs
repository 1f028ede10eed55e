use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::RegistryError;
use crate::names::normalize_package_name;
use crate::port::PortDescriptor;
use crate::registry::{NodeFactory, NodeRegistry};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeDescription {
  pub description: String,
  pub inputs: Vec<PortDescriptor>,
  pub outputs: Vec<PortDescriptor>,
}

impl NodeDescription {
  fn from_factory(factory: &dyn NodeFactory) -> Self {
    Self {
      description: factory.description().to_string(),
      inputs: factory.inputs(),
      outputs: factory.outputs(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageDescription {
  pub name: String,
  pub nodes: BTreeMap<String, NodeDescription>,
}

/// Sorted package keys.
pub fn list_packages(registry: &dyn NodeRegistry) -> Vec<String> {
  let mut keys = registry.package_keys();
  keys.sort();
  keys
}

/// Describe every node of a package, resolving the name like node execution
/// does.
pub fn describe_package(
  registry: &dyn NodeRegistry,
  name: &str,
) -> Result<PackageDescription, RegistryError> {
  let resolved = normalize_package_name(name, &registry.package_keys())
    .ok_or_else(|| RegistryError::PackageNotFound(name.to_string()))?;
  let package = registry
    .get_package(&resolved)
    .ok_or_else(|| RegistryError::PackageNotFound(name.to_string()))?;

  let nodes = package
    .node_names()
    .into_iter()
    .filter_map(|node_name| {
      let factory = package.get(&node_name)?;
      Some((node_name, NodeDescription::from_factory(factory)))
    })
    .collect();

  Ok(PackageDescription {
    name: resolved,
    nodes,
  })
}
