use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};

use crate::result::ExecutionResult;

/// Something that can execute a single registry node.
///
/// Failures are reported through [`ExecutionResult`], never as a panic or an
/// `Err`, so callers can always relay the outcome.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
  async fn execute_node(
    &self,
    package_name: &str,
    node_name: &str,
    inputs: Map<String, JsonValue>,
  ) -> ExecutionResult;
}

#[async_trait]
impl<T: NodeExecutor + ?Sized> NodeExecutor for &T {
  async fn execute_node(
    &self,
    package_name: &str,
    node_name: &str,
    inputs: Map<String, JsonValue>,
  ) -> ExecutionResult {
    (**self).execute_node(package_name, node_name, inputs).await
  }
}

#[async_trait]
impl<T: NodeExecutor + ?Sized> NodeExecutor for Arc<T> {
  async fn execute_node(
    &self,
    package_name: &str,
    node_name: &str,
    inputs: Map<String, JsonValue>,
  ) -> ExecutionResult {
    (**self).execute_node(package_name, node_name, inputs).await
  }
}
