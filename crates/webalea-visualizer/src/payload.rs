use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use webalea_runtime::marker;

/// A scene reference to resolve through the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneRefData {
  #[serde(rename = "ref")]
  pub ref_id: String,
  /// `scene_json_ref` or `scene_ref`.
  pub ref_type: String,
  pub expected_shape_count: Option<i64>,
}

/// Split a visualization payload into an inline scene and a scene reference.
///
/// An inline `scene` object (or `objects` list) wins outright. Otherwise the
/// `outputs` are scanned for the first inline scene and the first scene
/// reference marker; explicit `scene_ref` and `scene_ref_expected_shape_count`
/// keys override what the outputs say.
pub fn parse_visualization_payload(payload: &JsonValue) -> (Option<JsonValue>, Option<SceneRefData>) {
  let Some(payload) = payload.as_object().filter(|p| !p.is_empty()) else {
    return (None, None);
  };

  if let Some(scene) = inline_scene(payload) {
    return (Some(scene), None);
  }

  let outputs = payload
    .get("outputs")
    .and_then(JsonValue::as_array)
    .map(Vec::as_slice)
    .unwrap_or_default();
  let (scene, output_ref) = scan_outputs(outputs);

  let explicit_ref = payload
    .get("scene_ref")
    .and_then(JsonValue::as_str)
    .filter(|s| !s.is_empty());
  let expected = payload.get("scene_ref_expected_shape_count").and_then(JsonValue::as_i64);

  let scene_ref = match (output_ref, explicit_ref) {
    (Some(found), Some(ref_id)) => Some(SceneRefData {
      ref_id: ref_id.to_string(),
      ref_type: found.ref_type,
      expected_shape_count: expected.or(found.expected_shape_count),
    }),
    (Some(found), None) => Some(found),
    (None, Some(ref_id)) => Some(SceneRefData {
      ref_id: ref_id.to_string(),
      ref_type: marker::SCENE_REF.to_string(),
      expected_shape_count: expected,
    }),
    (None, None) => None,
  };

  (scene, scene_ref)
}

fn inline_scene(payload: &Map<String, JsonValue>) -> Option<JsonValue> {
  let scene = match (payload.get("scene"), payload.get("objects")) {
    (Some(JsonValue::Object(scene)), _) => JsonValue::Object(scene.clone()),
    (_, Some(JsonValue::Array(objects))) => serde_json::json!({ "objects": objects }),
    _ => return None,
  };
  Some(scene).filter(|s| s.as_object().is_some_and(|o| !o.is_empty()))
}

fn scan_outputs(outputs: &[JsonValue]) -> (Option<JsonValue>, Option<SceneRefData>) {
  let mut scene = None;
  let mut scene_ref = None;

  for value in outputs.iter().filter_map(|output| output.get("value")) {
    if is_falsy(value) {
      continue;
    }
    if scene.is_none() {
      scene = scene_from_value(value);
    }
    if scene_ref.is_none() {
      scene_ref = ref_from_value(value);
    }
    if scene.is_some() && scene_ref.is_some() {
      break;
    }
  }

  (scene, scene_ref)
}

fn scene_from_value(value: &JsonValue) -> Option<JsonValue> {
  if marker::marker_type(value) == Some(marker::SCENE_INLINE) {
    return value.get("scene").filter(|s| s.is_object()).cloned();
  }
  value
    .get("objects")
    .is_some_and(JsonValue::is_array)
    .then(|| value.clone())
}

fn ref_from_value(value: &JsonValue) -> Option<SceneRefData> {
  let ref_type = marker::marker_type(value).filter(|t| marker::is_scene_ref(t))?;
  let ref_id = marker::ref_id(value).filter(|id| !id.is_empty())?;
  Some(SceneRefData {
    ref_id,
    ref_type: ref_type.to_string(),
    expected_shape_count: marker::shape_count(value),
  })
}

fn is_falsy(value: &JsonValue) -> bool {
  match value {
    JsonValue::Null => true,
    JsonValue::Bool(b) => !b,
    JsonValue::Number(n) => n.as_f64() == Some(0.0),
    JsonValue::String(s) => s.is_empty(),
    JsonValue::Array(a) => a.is_empty(),
    JsonValue::Object(o) => o.is_empty(),
  }
}
