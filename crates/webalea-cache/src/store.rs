use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use tracing::{debug, info};
use webalea_value::{Value, scene_object_count};

use crate::{CacheConfig, CacheError};

const OBJECT_SUFFIX: &str = ".bin";
const SCENE_SUFFIX: &str = ".scene.json";

/// Disk-backed cache of raw values and scene documents.
///
/// Every write goes to a path derived from a fresh reference id, so
/// concurrent writers never share a file.
#[derive(Debug, Clone)]
pub struct ObjectCache {
  config: CacheConfig,
}

impl ObjectCache {
  pub fn new(config: CacheConfig) -> Self {
    Self { config }
  }

  pub fn from_env() -> Self {
    Self::new(CacheConfig::from_env())
  }

  pub fn dir(&self) -> &Path {
    &self.config.dir
  }

  pub fn ttl_seconds(&self) -> u64 {
    self.config.ttl_seconds
  }

  fn ensure_dir(&self) -> Result<&Path, CacheError> {
    fs::create_dir_all(&self.config.dir)?;
    Ok(&self.config.dir)
  }

  fn object_path(&self, ref_id: &str) -> PathBuf {
    self.config.dir.join(format!("{}{}", safe_id(ref_id), OBJECT_SUFFIX))
  }

  fn scene_path(&self, ref_id: &str) -> PathBuf {
    self.config.dir.join(format!("{}{}", safe_id(ref_id), SCENE_SUFFIX))
  }

  /// Persist a value under a fresh reference id.
  pub fn store(&self, value: &Value) -> Result<String, CacheError> {
    self.ensure_dir()?;
    let ref_id = new_ref_id();
    let path = self.object_path(&ref_id);
    let bytes = encode_to_vec(value, standard())?;
    fs::write(&path, bytes)?;
    info!(ref_id = %ref_id, path = %path.display(), "cache store object");
    Ok(ref_id)
  }

  /// Load a raw value. Missing entries are [`CacheError::NotFound`].
  pub fn load(&self, ref_id: &str) -> Result<Value, CacheError> {
    let path = self.object_path(ref_id);
    let bytes = fs::read(&path).map_err(|e| not_found_or_io(e, ref_id))?;
    let (value, _): (Value, usize) =
      decode_from_slice(&bytes, standard()).map_err(|e| CacheError::Decode {
        ref_id: ref_id.to_string(),
        message: e.to_string(),
      })?;
    info!(ref_id = %ref_id, path = %path.display(), "cache load object");
    Ok(value)
  }

  /// Persist a scene document under an explicit reference id.
  pub fn store_scene_json(&self, ref_id: &str, scene: &serde_json::Value) -> Result<(), CacheError> {
    self.ensure_dir()?;
    let path = self.scene_path(ref_id);
    let bytes = serde_json::to_vec(scene)?;
    fs::write(&path, bytes)?;
    info!(
      ref_id = %ref_id,
      objects = scene_object_count(scene),
      path = %path.display(),
      "cache store scene json"
    );
    Ok(())
  }

  /// Persist a scene document under a fresh reference id.
  pub fn store_scene_json_new(&self, scene: &serde_json::Value) -> Result<String, CacheError> {
    let ref_id = new_ref_id();
    self.store_scene_json(&ref_id, scene)?;
    Ok(ref_id)
  }

  /// Load a scene document, `None` when absent.
  pub fn load_scene_json(&self, ref_id: &str) -> Result<Option<serde_json::Value>, CacheError> {
    let path = self.scene_path(ref_id);
    let bytes = match fs::read(&path) {
      Ok(bytes) => bytes,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
      Err(e) => return Err(e.into()),
    };
    let scene: serde_json::Value = serde_json::from_slice(&bytes)?;
    info!(
      ref_id = %ref_id,
      objects = scene_object_count(&scene),
      path = %path.display(),
      "cache load scene json"
    );
    Ok(Some(scene))
  }

  /// Remove entries of both kinds older than `ttl_seconds` (the configured
  /// TTL when `None`). A TTL of zero or less removes nothing.
  ///
  /// Files that vanish or cannot be inspected mid-scan are skipped.
  pub fn cleanup(&self, ttl_seconds: Option<i64>) -> Result<usize, CacheError> {
    let ttl = ttl_seconds.unwrap_or_else(|| self.config.cleanup_ttl());
    if ttl <= 0 {
      return Ok(0);
    }

    let dir = self.ensure_dir()?;
    let now = SystemTime::now();
    let mut removed = 0;

    for entry in fs::read_dir(dir)? {
      let Ok(entry) = entry else {
        continue;
      };
      let path = entry.path();
      if !is_cache_file(&path) {
        continue;
      }
      let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
        continue;
      };
      let Ok(age) = now.duration_since(modified) else {
        continue;
      };
      if age.as_secs_f64() <= ttl as f64 {
        continue;
      }
      match fs::remove_file(&path) {
        Ok(()) => removed += 1,
        Err(e) => debug!(path = %path.display(), error = %e, "skipping cache entry"),
      }
    }

    if removed > 0 {
      info!(removed, ttl, "cache cleanup");
    }
    Ok(removed)
  }
}

fn is_cache_file(path: &Path) -> bool {
  path
    .file_name()
    .and_then(|name| name.to_str())
    .map(|name| name.ends_with(OBJECT_SUFFIX) || name.ends_with(SCENE_SUFFIX))
    .unwrap_or(false)
}

/// 128-bit random id rendered as 32 hex characters.
fn new_ref_id() -> String {
  uuid::Uuid::new_v4().simple().to_string()
}

fn safe_id(ref_id: &str) -> String {
  ref_id.replace(['/', '\\'], "_")
}

fn not_found_or_io(e: io::Error, ref_id: &str) -> CacheError {
  if e.kind() == io::ErrorKind::NotFound {
    CacheError::NotFound(ref_id.to_string())
  } else {
    CacheError::Io(e)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_safe_id_replaces_separators() {
    assert_eq!(safe_id("../etc/passwd"), ".._etc_passwd");
    assert_eq!(safe_id("a\\b"), "a_b");
  }

  #[test]
  fn test_ref_id_shape() {
    let id = new_ref_id();
    assert_eq!(id.len(), 32);
    assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
  }

  #[test]
  fn test_cache_file_kinds() {
    assert!(is_cache_file(Path::new("/tmp/x/abc.bin")));
    assert!(is_cache_file(Path::new("/tmp/x/abc.scene.json")));
    assert!(!is_cache_file(Path::new("/tmp/x/abc.json")));
    assert!(!is_cache_file(Path::new("/tmp/x/notes.txt")));
  }
}
