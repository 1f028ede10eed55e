#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
  #[error("Package '{0}' not found")]
  PackageNotFound(String),

  #[error("Node '{node}' not found in '{package}'")]
  NodeNotFound { package: String, node: String },

  #[error("unknown input '{0}'")]
  UnknownInput(String),

  #[error("input index {index} out of range ({count} inputs)")]
  InputOutOfRange { index: usize, count: usize },

  #[error("invalid value for input '{port}': expected {expected}, got {actual}")]
  InvalidInput {
    port: String,
    expected: String,
    actual: String,
  },

  #[error("{0}")]
  Evaluation(String),
}

impl RegistryError {
  pub fn is_not_found(&self) -> bool {
    matches!(
      self,
      RegistryError::PackageNotFound(_) | RegistryError::NodeNotFound { .. }
    )
  }
}
