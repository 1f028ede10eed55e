use std::panic::{AssertUnwindSafe, catch_unwind};

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};
use tracing::{error, info, instrument, warn};
use webalea_cache::ObjectCache;
use webalea_registry::{
  InputKey, Node, NodeRegistry, RegistryError, normalize_package_name, output_name,
};

use crate::error::RuntimeError;
use crate::executor::NodeExecutor;
use crate::resolver::InputResolver;
use crate::result::{ExecutionResult, NodeOutput};
use crate::serializer::ValueSerializer;

/// An input that could not be applied to a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFailure {
  pub key: String,
  pub message: String,
}

/// Per-input outcome of applying caller inputs to a node.
///
/// Input application is best-effort: a failing input is recorded and the
/// node still runs with whatever was applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputReport {
  pub applied: Vec<String>,
  pub failures: Vec<InputFailure>,
}

impl InputReport {
  pub fn is_complete(&self) -> bool {
    self.failures.is_empty()
  }

  pub fn warnings(&self) -> Vec<String> {
    self
      .failures
      .iter()
      .map(|f| format!("Failed to set input '{}': {}", f.key, f.message))
      .collect()
  }
}

/// Runs nodes in-process against a registry.
///
/// This is what a worker process does for each request; one evaluator (and
/// so one registry handle) serves every node of a composite.
pub struct NodeEvaluator<R> {
  registry: R,
  cache: ObjectCache,
}

impl<R: NodeRegistry> NodeEvaluator<R> {
  pub fn new(registry: R, cache: ObjectCache) -> Self {
    Self { registry, cache }
  }

  pub fn registry(&self) -> &R {
    &self.registry
  }

  pub fn cache(&self) -> &ObjectCache {
    &self.cache
  }

  /// Run one node. Errors are folded into a failed [`ExecutionResult`].
  pub fn run(&self, package_name: &str, node_name: &str, inputs: &Map<String, JsonValue>) -> ExecutionResult {
    match self.evaluate(package_name, node_name, inputs) {
      Ok(result) => result,
      Err(e) => {
        error!(package = %package_name, node = %node_name, error = %e, "node execution failed");
        ExecutionResult::failure(e.to_string())
      }
    }
  }

  #[instrument(name = "node_evaluate", skip(self, inputs), fields(package = %package_name, node = %node_name))]
  pub fn evaluate(
    &self,
    package_name: &str,
    node_name: &str,
    inputs: &Map<String, JsonValue>,
  ) -> Result<ExecutionResult, RuntimeError> {
    info!(inputs = inputs.len(), "executing node");

    let resolved = normalize_package_name(package_name, &self.registry.package_keys())
      .ok_or_else(|| RegistryError::PackageNotFound(package_name.to_string()))?;
    let package = self
      .registry
      .get_package(&resolved)
      .ok_or_else(|| RegistryError::PackageNotFound(package_name.to_string()))?;
    let factory = package
      .get(node_name)
      .ok_or_else(|| RegistryError::NodeNotFound {
        package: package_name.to_string(),
        node: node_name.to_string(),
      })?;

    let mut node = factory.instantiate()?;
    let report = self.apply_inputs(node.as_mut(), inputs);

    catch_unwind(AssertUnwindSafe(|| node.eval()))
      .map_err(|_| RegistryError::Evaluation(format!("node '{}' panicked during evaluation", node_name)))??;
    info!("node evaluation completed");

    let descriptors = factory.outputs();
    let serializer = ValueSerializer::new(&self.cache);
    let outputs = node
      .outputs()
      .iter()
      .enumerate()
      .map(|(index, value)| NodeOutput {
        index,
        name: output_name(&descriptors, index),
        value: serializer.serialize(value),
        value_type: value.type_name(),
      })
      .collect();

    Ok(ExecutionResult::success(outputs).with_warnings(report.warnings()))
  }

  /// Resolve and apply each input, by position for all-digit keys and by
  /// name otherwise.
  pub fn apply_inputs(&self, node: &mut dyn Node, inputs: &Map<String, JsonValue>) -> InputReport {
    let resolver = InputResolver::new(&self.cache);
    let mut report = InputReport::default();

    for (key, raw) in inputs {
      let outcome = resolver
        .resolve(raw)
        .map_err(|e| e.to_string())
        .and_then(|value| {
          info!(input = %key, value_type = %value.type_name(), "input resolved");
          node
            .set_input(&InputKey::parse(key), value)
            .map_err(|e| e.to_string())
        });

      match outcome {
        Ok(()) => report.applied.push(key.clone()),
        Err(message) => {
          warn!(input = %key, error = %message, "failed to set input");
          report.failures.push(InputFailure {
            key: key.clone(),
            message,
          });
        }
      }
    }

    report
  }
}

#[async_trait]
impl<R: NodeRegistry> NodeExecutor for NodeEvaluator<R> {
  async fn execute_node(
    &self,
    package_name: &str,
    node_name: &str,
    inputs: Map<String, JsonValue>,
  ) -> ExecutionResult {
    self.run(package_name, node_name, &inputs)
  }
}
