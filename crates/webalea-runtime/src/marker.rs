//! Reference marker conventions shared by the serializer, the input resolver
//! and the visualizer.
//!
//! A reference marker is a small JSON object standing in for a cached value:
//!
//! ```json
//! {"__type__": "scene_json_ref", "__ref__": "9f1c...", "__meta__": {"shape_count": 3, "object_count": 3}}
//! ```

use serde_json::Value as JsonValue;

pub const TYPE_KEY: &str = "__type__";
pub const REF_KEY: &str = "__ref__";
pub const META_KEY: &str = "__meta__";

/// Scene document stored in the scene cache.
pub const SCENE_JSON_REF: &str = "scene_json_ref";
/// Scene value stored in the raw object cache.
pub const SCENE_REF: &str = "scene_ref";
/// Scene document inlined under `scene`.
pub const SCENE_INLINE: &str = "scene_inline";
pub const DEPTH_LIMIT: &str = "DepthLimit";

/// The `__type__` of a marker-shaped object.
pub fn marker_type(value: &JsonValue) -> Option<&str> {
  value.get(TYPE_KEY).and_then(|t| t.as_str())
}

/// The reference id of an object carrying `__ref__`. Non-string ids are
/// rendered as JSON.
pub fn ref_id(value: &JsonValue) -> Option<String> {
  let object = value.as_object()?;
  match object.get(REF_KEY)? {
    JsonValue::String(id) => Some(id.clone()),
    other => Some(other.to_string()),
  }
}

/// Whether a marker type refers to a cached scene.
pub fn is_scene_ref(marker_type: &str) -> bool {
  marker_type == SCENE_REF || marker_type == SCENE_JSON_REF
}

/// `__meta__.shape_count` of a marker.
pub fn shape_count(value: &JsonValue) -> Option<i64> {
  value
    .get(META_KEY)
    .and_then(|meta| meta.get("shape_count"))
    .and_then(|count| count.as_i64())
}
