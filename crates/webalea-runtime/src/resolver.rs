use std::collections::BTreeMap;

use serde_json::Value as JsonValue;
use tracing::info;
use webalea_cache::{CacheError, ObjectCache};
use webalea_value::{Value, scene_from_json};

use crate::marker::{self, SCENE_JSON_REF};

/// Turns caller-supplied JSON back into node values.
///
/// The inverse of [`crate::ValueSerializer`]: any object carrying `__ref__` is
/// replaced by the cached value it points to. Scene document references are
/// read from the scene cache and rebuilt into a scene when possible; every
/// other reference is a raw cache load.
pub struct InputResolver<'a> {
  cache: &'a ObjectCache,
}

impl<'a> InputResolver<'a> {
  pub fn new(cache: &'a ObjectCache) -> Self {
    Self { cache }
  }

  pub fn resolve(&self, value: &JsonValue) -> Result<Value, CacheError> {
    match value {
      JsonValue::Object(map) => {
        if let Some(ref_id) = marker::ref_id(value) {
          return self.resolve_ref(&ref_id, marker::marker_type(value));
        }
        let resolved: BTreeMap<String, Value> = map
          .iter()
          .map(|(k, v)| Ok((k.clone(), self.resolve(v)?)))
          .collect::<Result<_, CacheError>>()?;
        Ok(Value::Map(resolved))
      }
      JsonValue::Array(items) => {
        let resolved: Vec<Value> = items
          .iter()
          .map(|item| self.resolve(item))
          .collect::<Result<_, _>>()?;
        Ok(Value::List(resolved))
      }
      other => Ok(Value::from(other.clone())),
    }
  }

  fn resolve_ref(&self, ref_id: &str, marker_type: Option<&str>) -> Result<Value, CacheError> {
    info!(ref_id = %ref_id, "resolving cached input");
    if marker_type == Some(SCENE_JSON_REF) {
      let scene_json = self
        .cache
        .load_scene_json(ref_id)?
        .ok_or_else(|| CacheError::NotFound(ref_id.to_string()))?;
      return Ok(match scene_from_json(&scene_json) {
        Some(scene) => Value::Scene(scene),
        None => Value::from(scene_json),
      });
    }
    self.cache.load(ref_id)
  }
}
