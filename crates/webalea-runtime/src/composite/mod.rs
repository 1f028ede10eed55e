//! Composite graph execution.
//!
//! Custom nodes (backed by the registry) run in dependency order; primitive
//! nodes only supply the static values declared on their output ports.
//! Values flow along edges as the JSON produced by node execution, so a
//! scene passed between nodes travels as a cache reference marker.

mod handle;
mod state;

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value as JsonValue};
use tracing::{debug, error, info, instrument};
use webalea_config::{CompositeNode, GraphNode};

use crate::error::CompositeError;
use crate::executor::NodeExecutor;
use crate::result::{ExecutionResult, NodeOutput, json_type_name};

pub use handle::parse_output_index;
use state::{InputState, InputStates, OutputTable};

/// Evaluates composite nodes on top of a [`NodeExecutor`].
///
/// Nodes run one at a time. A round scans every pending node in declaration
/// order and runs those whose custom predecessors have all executed; a round
/// that runs nothing means the graph is blocked. The first node failure
/// aborts the whole composite.
pub struct CompositeExecutor<E> {
  executor: E,
}

impl<E: NodeExecutor> CompositeExecutor<E> {
  pub fn new(executor: E) -> Self {
    Self { executor }
  }

  /// Execute a composite, folding failures into the result.
  pub async fn run(&self, composite: &CompositeNode) -> ExecutionResult {
    match self.execute(composite).await {
      Ok(outputs) => ExecutionResult::success(outputs),
      Err(e) => {
        error!(error = %e, "composite execution failed");
        ExecutionResult::failure(e.to_string())
      }
    }
  }

  #[instrument(
    name = "composite_execute",
    skip(self, composite),
    fields(
      nodes = composite.graph.nodes.len(),
      edges = composite.graph.edges.len(),
    )
  )]
  pub async fn execute(&self, composite: &CompositeNode) -> Result<Vec<NodeOutput>, CompositeError> {
    let graph = &composite.graph;
    if graph.nodes.is_empty() {
      return Err(CompositeError::EmptyGraph);
    }

    let index = GraphIndex::new(&graph.nodes);
    let custom: Vec<&GraphNode> = graph.nodes.iter().filter(|n| n.is_custom()).collect();
    let custom_ids: HashSet<&str> = custom.iter().map(|n| n.id.as_str()).collect();

    let mut states = InputStates::default();
    let mut dependencies: HashMap<&str, HashSet<&str>> = HashMap::new();
    for node in &custom {
      let ports = node
        .data
        .inputs
        .iter()
        .filter_map(|port| {
          let id = port.id.clone()?;
          Some((
            id,
            InputState {
              received: false,
              value: port.value_or_default(),
              edge: None,
            },
          ))
        })
        .collect();
      states.insert_node(&node.id, ports);
      dependencies.insert(node.id.as_str(), HashSet::new());
    }

    for (position, edge) in graph.edges.iter().enumerate() {
      if !states.has_node(&edge.target) {
        continue;
      }
      if custom_ids.contains(edge.source.as_str()) {
        if let Some(deps) = dependencies.get_mut(edge.target.as_str()) {
          deps.insert(edge.source.as_str());
        }
        continue;
      }
      let value = index
        .get(&edge.source)
        .and_then(|source| primitive_output_value(source, edge.source_handle.as_deref()));
      if let Some(port) = &edge.target_handle {
        states.set_from_edge(&edge.target, port, position, value);
      }
    }

    apply_composite_inputs(composite, &index, &mut states);

    let mut executed: HashSet<&str> = HashSet::new();
    let mut tables: Vec<(String, OutputTable)> = Vec::new();

    while executed.len() < custom.len() {
      let mut progressed = false;

      for node in &custom {
        let node_id = node.id.as_str();
        if executed.contains(node_id) {
          continue;
        }
        let ready = dependencies
          .get(node_id)
          .is_none_or(|deps| deps.iter().all(|dep| executed.contains(dep)));
        if !ready {
          continue;
        }

        let (Some(package_name), Some(node_name)) = (
          non_empty(node.data.package_name.as_deref()),
          non_empty(node.data.node_name.as_deref()),
        ) else {
          return Err(CompositeError::MissingNodeIdentity {
            node_id: node.id.clone(),
          });
        };

        let inputs = node_inputs(node, &states);
        info!(node_id = %node_id, package = %package_name, node = %node_name, "executing composite node");
        let result = self
          .executor
          .execute_node(package_name, node_name, inputs)
          .await;
        if !result.success {
          return Err(CompositeError::NodeFailed {
            node_id: node.id.clone(),
            message: result.error_message(),
          });
        }

        let table = output_table(node, &result.outputs);
        executed.insert(node_id);
        progressed = true;

        for (position, edge) in graph.edges.iter().enumerate().filter(|(_, e)| e.source == node.id) {
          if executed.contains(edge.target.as_str()) || !states.has_node(&edge.target) {
            continue;
          }
          let value = edge_value(&table, edge.source_handle.as_deref());
          if let Some(port) = &edge.target_handle {
            states.set_from_edge(&edge.target, port, position, value);
          }
        }
        tables.push((node.id.clone(), table));
      }

      if !progressed {
        let pending = custom
          .iter()
          .filter(|n| !executed.contains(n.id.as_str()))
          .map(|n| n.id.clone())
          .collect();
        return Err(CompositeError::Blocked { pending });
      }
    }

    info!(executed = executed.len(), "composite nodes executed");
    Ok(composite_outputs(composite, &index, &tables))
  }
}

/// Lookup of graph nodes by id, or by label when no id matches.
struct GraphIndex<'a> {
  nodes: &'a [GraphNode],
  by_id: HashMap<&'a str, &'a GraphNode>,
}

impl<'a> GraphIndex<'a> {
  fn new(nodes: &'a [GraphNode]) -> Self {
    let by_id = nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    Self { nodes, by_id }
  }

  fn get(&self, id: &str) -> Option<&'a GraphNode> {
    self.by_id.get(id).copied()
  }

  fn find_by_label(&self, label: &str) -> Option<&'a GraphNode> {
    self.nodes.iter().find(|n| n.matches_label(label))
  }

  fn resolve(&self, key: &str) -> Option<&'a GraphNode> {
    self.get(key).or_else(|| self.find_by_label(key))
  }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
  value.filter(|s| !s.is_empty())
}

fn is_missing(value: &Option<JsonValue>) -> bool {
  value.as_ref().is_none_or(JsonValue::is_null)
}

/// Static value of a primitive node's output: by port id, then by the index
/// encoded in the handle, then the first output.
fn primitive_output_value(node: &GraphNode, handle: Option<&str>) -> Option<JsonValue> {
  let outputs = &node.data.outputs;
  if let Some(handle) = handle
    && let Some(port) = outputs.iter().find(|p| p.id.as_deref() == Some(handle))
  {
    return port.value.clone();
  }
  if let Some(index) = handle.and_then(parse_output_index)
    && index < outputs.len()
  {
    return outputs[index].value.clone();
  }
  outputs.first().and_then(|p| p.value.clone())
}

/// Route composite-level input values into node input states.
///
/// Explicit mappings apply first. Inputs that no explicit mapping delivered
/// then go through the naming conventions: `<label>_<port>` and a direct
/// match on an input port id.
fn apply_composite_inputs(composite: &CompositeNode, index: &GraphIndex<'_>, states: &mut InputStates) {
  let mut covered: HashSet<usize> = HashSet::new();

  for mapping in composite.input_mappings().unwrap_or_default() {
    let (Some(source), Some(target)) = (mapping.source.as_deref(), mapping.target.as_ref()) else {
      continue;
    };
    let Some((position, input)) = composite
      .inputs
      .iter()
      .enumerate()
      .find(|(_, input)| input.is_named(source))
    else {
      continue;
    };
    let Some((node_key, port)) = target.node_and_port() else {
      continue;
    };
    let Some(node) = index.resolve(node_key) else {
      continue;
    };
    if states.set(&node.id, port, input.value_or_default()) {
      debug!(input = %source, node_id = %node.id, port = %port, "applied input mapping");
      covered.insert(position);
    }
  }

  for (position, input) in composite.inputs.iter().enumerate() {
    if covered.contains(&position) {
      continue;
    }
    let value = input.value_or_default();
    let name = input.name.as_deref().unwrap_or_default();

    if let Some((label, port)) = name.split_once('_')
      && let Some(node) = index.find_by_label(label)
    {
      let suffix = format!("_{}", port);
      let matched = node.data.inputs.iter().find(|p| {
        p.name.as_deref() == Some(port) || p.id.as_deref().is_some_and(|id| id.ends_with(&suffix))
      });
      if let Some(port_id) = matched.and_then(|p| p.id.as_deref()) {
        states.set(&node.id, port_id, value.clone());
      }
    }

    if !name.is_empty() {
      for node_id in states.nodes_with_port(name) {
        states.set(&node_id, name, value.clone());
      }
    }
  }
}

/// Inputs for one node, keyed by port name (or id when unnamed).
///
/// Ports that never received a value fall back to their declared default;
/// ports with neither are left out so the node keeps its own default.
fn node_inputs(node: &GraphNode, states: &InputStates) -> Map<String, JsonValue> {
  let mut inputs = Map::new();
  for port in &node.data.inputs {
    let Some(key) = non_empty(port.name.as_deref()).or(port.id.as_deref()) else {
      continue;
    };
    let state = port.id.as_deref().and_then(|id| states.get(&node.id, id));
    if !state.is_some_and(|s| s.received) {
      debug!(node_id = %node.id, port = %key, "input not connected, using declared value");
    }
    let mut value = state.and_then(|s| s.value.clone());
    if is_missing(&value) {
      value = port.default.clone();
    }
    if let Some(value) = value.filter(|v| !v.is_null()) {
      inputs.insert(key.to_string(), value);
    }
  }
  inputs
}

fn output_table(node: &GraphNode, outputs: &[NodeOutput]) -> OutputTable {
  let mut table = OutputTable::default();
  for (i, output) in outputs.iter().enumerate() {
    if let Some(port) = node.data.outputs.get(i) {
      if let Some(id) = non_empty(port.id.as_deref()) {
        table.insert(id, output.value.clone());
      }
      if let Some(name) = non_empty(port.name.as_deref()) {
        table.insert(name, output.value.clone());
      }
    }
    table.insert(format!("output_{}", i), output.value.clone());
  }
  table
}

/// Value carried by an edge leaving an executed node: exact key, then
/// `output_<i>` from the handle, then the first output.
fn edge_value(table: &OutputTable, handle: Option<&str>) -> Option<JsonValue> {
  if let Some(value) = handle.and_then(|h| table.get(h)) {
    return Some(value.clone());
  }
  handle
    .and_then(parse_output_index)
    .and_then(|i| table.get(&format!("output_{}", i)))
    .filter(|v| !v.is_null())
    .or_else(|| table.first())
    .cloned()
}

fn find_table<'t>(tables: &'t [(String, OutputTable)], node_id: &str) -> Option<&'t OutputTable> {
  tables.iter().find(|(id, _)| id == node_id).map(|(_, t)| t)
}

/// Resolve each declared composite output: explicit mapping, then the
/// `<label>_<port>` convention, then the first output of the last node run.
fn composite_outputs(
  composite: &CompositeNode,
  index: &GraphIndex<'_>,
  tables: &[(String, OutputTable)],
) -> Vec<NodeOutput> {
  let mappings = composite.output_mappings().unwrap_or_default();

  composite
    .outputs
    .iter()
    .enumerate()
    .map(|(i, def)| {
      let fallback = format!("output_{}", i);
      let out_id = def.id.clone().unwrap_or_else(|| fallback.clone());
      let out_name = def.name.clone().unwrap_or(fallback);

      let mut value = None;
      for mapping in &mappings {
        let Some(target) = mapping.target.as_ref().and_then(|t| t.as_path()) else {
          continue;
        };
        if target != out_id && target != out_name {
          continue;
        }
        let Some((node_key, port)) = mapping.source.as_deref().and_then(|s| s.split_once(':')) else {
          continue;
        };
        if let Some(table) = index
          .resolve(node_key)
          .and_then(|node| find_table(tables, &node.id))
        {
          value = table.get(port).cloned();
          break;
        }
      }

      if is_missing(&value)
        && let Some((label, port)) = out_name.split_once('_')
      {
        value = index
          .find_by_label(label)
          .and_then(|node| find_table(tables, &node.id))
          .and_then(|table| table.get(port))
          .cloned();
      }

      if is_missing(&value) {
        value = tables.last().and_then(|(_, table)| table.first()).cloned();
      }

      let value = value.unwrap_or(JsonValue::Null);
      NodeOutput {
        index: i,
        name: out_name,
        value_type: json_type_name(&value).to_string(),
        value,
      }
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use webalea_config::{Edge, NodeData, PortDef};

  fn port(id: &str, name: &str) -> PortDef {
    PortDef {
      id: Some(id.to_string()),
      name: Some(name.to_string()),
      ..Default::default()
    }
  }

  fn node(id: &str, outputs: Vec<PortDef>) -> GraphNode {
    GraphNode {
      id: id.to_string(),
      node_type: Some("custom".to_string()),
      data: NodeData {
        package_name: Some("openalea.math".to_string()),
        node_name: Some("addition".to_string()),
        label: Some(id.to_string()),
        inputs: vec![port(&format!("{}_a", id), "a")],
        outputs,
      },
    }
  }

  #[test]
  fn test_primitive_output_lookup() {
    let mut primitive = node("p", vec![port("p_out_0", "x"), port("p_out_1", "y")]);
    primitive.data.outputs[0].value = Some(json!(1));
    primitive.data.outputs[1].value = Some(json!(2));

    assert_eq!(primitive_output_value(&primitive, Some("p_out_1")), Some(json!(2)));
    assert_eq!(primitive_output_value(&primitive, Some("p-1")), Some(json!(2)));
    assert_eq!(primitive_output_value(&primitive, Some("p-9")), Some(json!(1)));
    assert_eq!(primitive_output_value(&primitive, None), Some(json!(1)));
  }

  #[test]
  fn test_output_table_keys() {
    let n = node("n", vec![port("n_out", "sum")]);
    let outputs = vec![
      NodeOutput {
        index: 0,
        name: "sum".to_string(),
        value: json!(3),
        value_type: "int".to_string(),
      },
      NodeOutput {
        index: 1,
        name: "extra".to_string(),
        value: json!(4),
        value_type: "int".to_string(),
      },
    ];
    let table = output_table(&n, &outputs);
    assert_eq!(table.get("n_out"), Some(&json!(3)));
    assert_eq!(table.get("sum"), Some(&json!(3)));
    assert_eq!(table.get("output_0"), Some(&json!(3)));
    assert_eq!(table.get("output_1"), Some(&json!(4)));
    assert_eq!(table.get("extra"), None);
  }

  #[test]
  fn test_edge_value_fallbacks() {
    let mut table = OutputTable::default();
    table.insert("out_a", json!("a"));
    table.insert("output_0", json!("a"));
    table.insert("output_1", json!("b"));

    assert_eq!(edge_value(&table, Some("out_a")), Some(json!("a")));
    assert_eq!(edge_value(&table, Some("n_port_1_x")), Some(json!("b")));
    assert_eq!(edge_value(&table, Some("unknown")), Some(json!("a")));
    assert_eq!(edge_value(&table, None), Some(json!("a")));
    assert_eq!(edge_value(&OutputTable::default(), Some("x")), None);
  }

  #[test]
  fn test_node_inputs_fall_back_to_defaults() {
    let mut n = node("n", vec![]);
    n.data.inputs = vec![
      PortDef {
        id: Some("n_a".to_string()),
        name: Some("a".to_string()),
        default: Some(json!(7)),
        ..Default::default()
      },
      port("n_b", "b"),
      PortDef {
        id: Some("n_c".to_string()),
        ..Default::default()
      },
    ];
    let mut states = InputStates::default();
    states.insert_node(
      "n",
      HashMap::from([
        ("n_a".to_string(), InputState::default()),
        ("n_b".to_string(), InputState::default()),
        ("n_c".to_string(), InputState::default()),
      ]),
    );
    states.set("n", "n_c", Some(json!("c")));

    let inputs = node_inputs(&n, &states);
    assert_eq!(inputs.get("a"), Some(&json!(7)));
    assert_eq!(inputs.get("b"), None);
    assert_eq!(inputs.get("n_c"), Some(&json!("c")));
  }

  #[test]
  fn test_edges_into_unknown_targets_are_ignored() {
    let graph_nodes = vec![node("a", vec![])];
    let index = GraphIndex::new(&graph_nodes);
    assert!(index.resolve("a").is_some());
    assert!(index.resolve("missing").is_none());

    let edge = Edge {
      source: "a".to_string(),
      target: "missing".to_string(),
      source_handle: None,
      target_handle: Some("x".to_string()),
    };
    let mut states = InputStates::default();
    assert!(!states.set(&edge.target, "x", Some(json!(1))));
  }
}
