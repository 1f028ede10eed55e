use webalea_cache::CacheError;

#[derive(Debug, thiserror::Error)]
pub enum VisualizerError {
  /// A `scene_json_ref` has no fallback, so a missing document is fatal.
  #[error("Scene JSON cache entry not found: {ref_id}")]
  SceneJsonMissing { ref_id: String },

  #[error("Failed to load scene cache: {source}")]
  CacheLoad {
    ref_id: String,
    #[source]
    source: CacheError,
  },

  #[error("Unsupported type for 3D rendering")]
  Unsupported { type_name: String },

  #[error("No visualizable data found in visualization_data")]
  NoData,

  #[error(transparent)]
  Cache(#[from] CacheError),
}
