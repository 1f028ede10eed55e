use std::io;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
  #[error("cached object not found: {0}")]
  NotFound(String),

  #[error("cache io error: {0}")]
  Io(#[from] io::Error),

  #[error("failed to encode cached object: {0}")]
  Encode(#[from] bincode::error::EncodeError),

  #[error("failed to decode cached object {ref_id}: {message}")]
  Decode { ref_id: String, message: String },

  #[error("invalid scene json: {0}")]
  Json(#[from] serde_json::Error),
}

impl CacheError {
  pub fn is_not_found(&self) -> bool {
    matches!(self, CacheError::NotFound(_))
  }
}
