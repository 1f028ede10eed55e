//! Runtime errors.

use std::io;
use std::time::Duration;

use webalea_cache::CacheError;
use webalea_registry::RegistryError;

/// Errors raised while running a node or a worker request.
///
/// These never cross the execution boundary: [`crate::ExecutionResult`]
/// carries their message instead.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
  #[error(transparent)]
  Registry(#[from] RegistryError),

  #[error(transparent)]
  Cache(#[from] CacheError),

  /// The worker exceeded its wall-clock budget.
  #[error("Execution timed out after {} seconds", format_seconds(.timeout))]
  Timeout { timeout: Duration },

  #[error("No output from subprocess")]
  NoOutput,

  #[error("Invalid JSON response: {snippet}")]
  InvalidResponse { snippet: String },

  /// The worker program could not be started.
  #[error("Execution environment not properly configured: {0}")]
  Environment(#[source] io::Error),

  #[error("subprocess io error: {0}")]
  Io(#[from] io::Error),

  #[error("{0}")]
  InvalidRequest(String),

  #[error(transparent)]
  Composite(#[from] CompositeError),
}

/// Composite-level failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompositeError {
  #[error("Composite graph has no nodes")]
  EmptyGraph,

  #[error("Missing package or node name for {node_id}")]
  MissingNodeIdentity { node_id: String },

  /// No pending node became eligible during a full round.
  #[error("Composite execution blocked (cycle or missing inputs)")]
  Blocked { pending: Vec<String> },

  /// A node failed; its own error message is reported as-is.
  #[error("{message}")]
  NodeFailed { node_id: String, message: String },
}

fn format_seconds(timeout: &Duration) -> String {
  if timeout.subsec_nanos() == 0 {
    timeout.as_secs().to_string()
  } else {
    timeout.as_secs_f64().to_string()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_timeout_message() {
    let err = RuntimeError::Timeout {
      timeout: Duration::from_secs(60),
    };
    assert_eq!(err.to_string(), "Execution timed out after 60 seconds");

    let err = RuntimeError::Timeout {
      timeout: Duration::from_millis(250),
    };
    assert_eq!(err.to_string(), "Execution timed out after 0.25 seconds");
  }

  #[test]
  fn test_registry_messages_pass_through() {
    let err = RuntimeError::from(RegistryError::PackageNotFound("vplants".to_string()));
    assert_eq!(err.to_string(), "Package 'vplants' not found");
  }
}
