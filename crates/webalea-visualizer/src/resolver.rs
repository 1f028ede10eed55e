use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{error, info, instrument, warn};
use webalea_cache::ObjectCache;
use webalea_runtime::marker;
use webalea_value::{Value, scene_object_count, scene_to_json};

use crate::error::VisualizerError;
use crate::payload::{SceneRefData, parse_visualization_payload};

pub const EMPTY_SCENE_WARNING: &str = "Scene contains no objects.";

/// Answer to a visualization request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualizationResponse {
  pub node_id: String,
  pub success: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub scene: Option<JsonValue>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  #[serde(default)]
  pub cache_hit: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub warning: Option<String>,
}

impl VisualizationResponse {
  fn scene(node_id: &str, scene: JsonValue, cache_hit: bool) -> Self {
    let empty = scene
      .get("objects")
      .and_then(JsonValue::as_array)
      .is_some_and(Vec::is_empty);
    Self {
      node_id: node_id.to_string(),
      success: true,
      scene: Some(scene),
      error: None,
      cache_hit,
      warning: empty.then(|| EMPTY_SCENE_WARNING.to_string()),
    }
  }

  fn error(node_id: &str, message: String) -> Self {
    Self {
      node_id: node_id.to_string(),
      success: false,
      scene: None,
      error: Some(message),
      cache_hit: false,
      warning: None,
    }
  }
}

/// Resolves visualization payloads into scene documents.
pub struct VisualizationResolver<'a> {
  cache: &'a ObjectCache,
}

impl<'a> VisualizationResolver<'a> {
  pub fn new(cache: &'a ObjectCache) -> Self {
    Self { cache }
  }

  /// Resolve a payload, reporting failures in the response.
  pub fn resolve(&self, node_id: &str, payload: &JsonValue) -> VisualizationResponse {
    match self.resolve_scene(node_id, payload) {
      Ok((scene, cache_hit)) => VisualizationResponse::scene(node_id, scene, cache_hit),
      Err(e) => {
        warn!(node_id = %node_id, error = %e, "visualization failed");
        VisualizationResponse::error(node_id, e.to_string())
      }
    }
  }

  /// The scene for a payload and whether it came straight from the scene
  /// JSON cache.
  ///
  /// Sources are tried in order: inline scene, scene found in outputs,
  /// scene reference, raw value.
  #[instrument(name = "visualization_resolve", skip(self, payload), fields(node_id = %node_id))]
  pub fn resolve_scene(&self, node_id: &str, payload: &JsonValue) -> Result<(JsonValue, bool), VisualizerError> {
    let (scene, scene_ref) = parse_visualization_payload(payload);

    if let Some(scene) = scene {
      info!(objects = scene_object_count(&scene), "using inline scene");
      return Ok((scene, false));
    }

    if let Some(scene_ref) = scene_ref {
      return self.resolve_ref(&scene_ref);
    }

    if let Some(raw) = payload.get("raw").filter(|raw| !raw.is_null()) {
      info!("received raw payload");
      // Only scene-like raw values are rendered.
      if let Ok(value) = serde_json::from_value::<Value>(raw.clone())
        && let Some(scene) = value.to_scene()
      {
        let scene = scene_to_json(&scene);
        info!(objects = scene_object_count(&scene), "scene generated from raw value");
        return Ok((scene, false));
      }
    }

    Err(VisualizerError::NoData)
  }

  fn resolve_ref(&self, scene_ref: &SceneRefData) -> Result<(JsonValue, bool), VisualizerError> {
    let ref_id = scene_ref.ref_id.as_str();
    info!(
      ref_id = %ref_id,
      ref_type = %scene_ref.ref_type,
      expected_shape_count = ?scene_ref.expected_shape_count,
      "resolving scene reference"
    );

    if let Some(scene) = self
      .cache
      .load_scene_json(ref_id)?
      .filter(|s| s.as_object().is_none_or(|o| !o.is_empty()))
    {
      info!(ref_id = %ref_id, objects = scene_object_count(&scene), "scene json cache hit");
      return Ok((scene, true));
    }

    if scene_ref.ref_type == marker::SCENE_JSON_REF {
      error!(ref_id = %ref_id, "scene json reference missing on disk");
      return Err(VisualizerError::SceneJsonMissing {
        ref_id: ref_id.to_string(),
      });
    }

    let value = self.cache.load(ref_id).map_err(|source| {
      error!(ref_id = %ref_id, error = %source, "failed to load scene object");
      VisualizerError::CacheLoad {
        ref_id: ref_id.to_string(),
        source,
      }
    })?;
    let scene = value.to_scene().ok_or_else(|| VisualizerError::Unsupported {
      type_name: value.type_name(),
    })?;

    let scene_json = scene_to_json(&scene);
    if let Err(e) = self.cache.store_scene_json(ref_id, &scene_json) {
      warn!(ref_id = %ref_id, error = %e, "failed to cache generated scene json");
    }

    let objects = scene_object_count(&scene_json);
    if let Some(expected) = scene_ref.expected_shape_count
      && expected > 0
      && objects == 0
    {
      warn!(ref_id = %ref_id, expected_shape_count = expected, objects, "scene object count mismatch");
    }
    info!(ref_id = %ref_id, objects, "scene generated from reference");
    Ok((scene_json, false))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_empty_scene_warning() {
    let response = VisualizationResponse::scene("n1", json!({"objects": []}), false);
    assert_eq!(response.warning.as_deref(), Some(EMPTY_SCENE_WARNING));

    let response = VisualizationResponse::scene("n1", json!({"objects": [{}]}), true);
    assert_eq!(response.warning, None);
    assert!(response.cache_hit);
  }

  #[test]
  fn test_response_field_names() {
    let response = VisualizationResponse::error("n1", "boom".to_string());
    assert_eq!(
      serde_json::to_value(&response).unwrap(),
      json!({"nodeId": "n1", "success": false, "error": "boom", "cacheHit": false})
    );
  }
}
