use serde_json::{Map, Value as JsonValue, json};
use tracing::{info, warn};
use webalea_cache::ObjectCache;
use webalea_value::{Scene, Value, scene_object_count, scene_to_json};

use crate::marker::{
  DEPTH_LIMIT, META_KEY, REF_KEY, SCENE_INLINE, SCENE_JSON_REF, SCENE_REF, TYPE_KEY,
};

pub const DEFAULT_MAX_DEPTH: usize = 3;

/// Converts node values into JSON-safe payloads.
///
/// Plain data is inlined. Scene-like values are stored in the cache as a
/// scene document, falling back to the raw value and finally to an inline
/// document. Any other opaque value is stored raw and replaced by a reference
/// marker. Serialization itself never fails.
pub struct ValueSerializer<'a> {
  cache: &'a ObjectCache,
  max_depth: usize,
}

impl<'a> ValueSerializer<'a> {
  pub fn new(cache: &'a ObjectCache) -> Self {
    Self {
      cache,
      max_depth: DEFAULT_MAX_DEPTH,
    }
  }

  pub fn with_max_depth(mut self, max_depth: usize) -> Self {
    self.max_depth = max_depth;
    self
  }

  pub fn serialize(&self, value: &Value) -> JsonValue {
    self.serialize_at(value, 0)
  }

  fn serialize_at(&self, value: &Value, depth: usize) -> JsonValue {
    if depth > self.max_depth {
      return json!({ TYPE_KEY: DEPTH_LIMIT, "summary": "Max depth reached" });
    }
    if value.is_none() {
      return JsonValue::Null;
    }
    if let Some(scene) = value.to_scene() {
      return self.serialize_scene(&scene);
    }

    match value {
      Value::Bool(b) => JsonValue::Bool(*b),
      Value::Int(i) => JsonValue::from(*i),
      Value::Float(x) => serde_json::Number::from_f64(*x)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(x.to_string())),
      Value::Str(s) => JsonValue::String(s.clone()),
      Value::List(items) | Value::Tuple(items) => JsonValue::Array(
        items
          .iter()
          .map(|item| self.serialize_at(item, depth + 1))
          .collect(),
      ),
      Value::Map(map) => JsonValue::Object(
        map
          .iter()
          .map(|(k, v)| (k.clone(), self.serialize_at(v, depth + 1)))
          .collect::<Map<_, _>>(),
      ),
      other => match other.to_list() {
        Some(list) => list,
        None => self.serialize_cached(other),
      },
    }
  }

  fn serialize_scene(&self, scene: &Scene) -> JsonValue {
    let shape_count = scene.len();
    info!(shape_count, "preparing scene for cache");

    let scene_json = scene_to_json(scene);
    let object_count = scene_object_count(&scene_json);
    match self.cache.store_scene_json_new(&scene_json) {
      Ok(ref_id) => {
        info!(ref_id = %ref_id, shape_count, object_count, "cached scene json");
        return json!({
          TYPE_KEY: SCENE_JSON_REF,
          REF_KEY: ref_id,
          META_KEY: { "shape_count": shape_count, "object_count": object_count },
        });
      }
      Err(e) => warn!(error = %e, "failed to cache scene json, falling back to object cache"),
    }

    match self.cache.store(&Value::Scene(scene.clone())) {
      Ok(ref_id) => {
        info!(ref_id = %ref_id, shape_count, "cached scene object");
        return json!({
          TYPE_KEY: SCENE_REF,
          REF_KEY: ref_id,
          META_KEY: { "shape_count": shape_count },
        });
      }
      Err(e) => warn!(error = %e, "failed to cache scene object, inlining scene"),
    }

    json!({ TYPE_KEY: SCENE_INLINE, "scene": scene_json })
  }

  fn serialize_cached(&self, value: &Value) -> JsonValue {
    match self.cache.store(value) {
      Ok(ref_id) => json!({
        TYPE_KEY: value.qualified_type_name(),
        REF_KEY: ref_id,
        "summary": value.to_string(),
      }),
      Err(e) => {
        warn!(error = %e, "failed to cache object, using its summary");
        JsonValue::String(value.to_string())
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use webalea_cache::CacheConfig;
  use webalea_value::{Geometry, Material, NdArray, OpaqueObject, Shape};

  fn create_test_cache() -> (ObjectCache, tempfile::TempDir) {
    let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
    let cache = ObjectCache::new(CacheConfig::new(temp_dir.path()));
    (cache, temp_dir)
  }

  /// A cache whose root is a regular file, so every write fails.
  fn create_broken_cache() -> (ObjectCache, tempfile::NamedTempFile) {
    let file = tempfile::NamedTempFile::new().expect("failed to create temp file");
    let cache = ObjectCache::new(CacheConfig::new(file.path()));
    (cache, file)
  }

  fn nested(depth: usize) -> Value {
    (0..depth).fold(Value::Int(1), |inner, _| Value::List(vec![inner]))
  }

  #[test]
  fn test_plain_values_pass_through() {
    let (cache, _temp) = create_test_cache();
    let serializer = ValueSerializer::new(&cache);

    let value = Value::from(json!({"a": [1, 2.5, "x", true, null]}));
    assert_eq!(
      serializer.serialize(&value),
      json!({"a": [1, 2.5, "x", true, null]})
    );
    assert_eq!(
      serializer.serialize(&Value::Tuple(vec![Value::Int(1), Value::Int(2)])),
      json!([1, 2])
    );
    assert_eq!(serializer.serialize(&Value::Float(f64::INFINITY)), json!("inf"));
  }

  #[test]
  fn test_depth_limit_marker() {
    let (cache, _temp) = create_test_cache();
    let serializer = ValueSerializer::new(&cache);

    // Six levels of nesting: the list at depth 4 is replaced.
    let out = serializer.serialize(&nested(6));
    let marker = &out[0][0][0][0];
    assert_eq!(marker, &json!({"__type__": "DepthLimit", "summary": "Max depth reached"}));

    let shallow = ValueSerializer::new(&cache).with_max_depth(0);
    assert_eq!(shallow.serialize(&Value::Int(1)), json!(1));
    assert_eq!(shallow.serialize(&nested(1))[0]["__type__"], "DepthLimit");
  }

  #[test]
  fn test_array_uses_list_conversion() {
    let (cache, _temp) = create_test_cache();
    let serializer = ValueSerializer::new(&cache);
    let array = Value::Array(NdArray::new(vec![2, 1], vec![1.0, 2.0]));
    assert_eq!(serializer.serialize(&array), json!([[1.0], [2.0]]));
  }

  #[test]
  fn test_scene_becomes_json_ref() {
    let (cache, _temp) = create_test_cache();
    let serializer = ValueSerializer::new(&cache);
    let shape = Value::Shape(Shape::new(Geometry::cuboid(1.0, 1.0, 1.0), Material::default()));

    let marker = serializer.serialize(&shape);
    assert_eq!(marker["__type__"], "scene_json_ref");
    assert_eq!(marker["__meta__"], json!({"shape_count": 1, "object_count": 1}));

    let ref_id = marker["__ref__"].as_str().unwrap();
    let stored = cache.load_scene_json(ref_id).unwrap().unwrap();
    assert_eq!(scene_object_count(&stored), 1);
  }

  #[test]
  fn test_scene_inlined_when_cache_unwritable() {
    let (cache, _file) = create_broken_cache();
    let serializer = ValueSerializer::new(&cache);
    let geometry = Value::Geometry(Geometry::Polyline {
      points: vec![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]],
    });

    let out = serializer.serialize(&geometry);
    assert_eq!(out["__type__"], "scene_inline");
    assert_eq!(out["scene"]["objects"][0]["objectType"], "line");
  }

  #[test]
  fn test_opaque_object_is_cached() {
    let (cache, _temp) = create_test_cache();
    let serializer = ValueSerializer::new(&cache);
    let object = Value::Object(OpaqueObject::new("openalea.mtg.MTG", "<MTG 3 vertices>"));

    let marker = serializer.serialize(&object);
    assert_eq!(marker["__type__"], "openalea.mtg.MTG");
    assert_eq!(marker["summary"], "<MTG 3 vertices>");
    let ref_id = marker["__ref__"].as_str().unwrap();
    assert_eq!(cache.load(ref_id).unwrap(), object);
  }

  #[test]
  fn test_opaque_object_degrades_to_summary() {
    let (cache, _file) = create_broken_cache();
    let serializer = ValueSerializer::new(&cache);
    let object = Value::Object(OpaqueObject::new("pkg.Thing", "<Thing>"));
    assert_eq!(serializer.serialize(&object), json!("<Thing>"));
  }
}
