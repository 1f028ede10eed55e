//! Integration tests for ObjectCache against a temporary directory.

use std::collections::HashSet;
use std::fs::File;
use std::time::SystemTime;

use serde_json::json;
use webalea_cache::{CacheConfig, CacheError, ObjectCache};
use webalea_value::{Geometry, Material, OpaqueObject, Scene, Shape, Value, scene_to_json};

fn create_test_cache() -> (ObjectCache, tempfile::TempDir) {
  let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
  let cache = ObjectCache::new(CacheConfig::new(temp_dir.path().join("cache")));
  (cache, temp_dir)
}

fn age_file(path: &std::path::Path) {
  File::options()
    .write(true)
    .open(path)
    .expect("failed to open cache file")
    .set_modified(SystemTime::UNIX_EPOCH)
    .expect("failed to set mtime");
}

#[test]
fn test_store_load_round_trip() {
  let (cache, _temp) = create_test_cache();

  let values = vec![
    Value::Int(42),
    Value::Str("hello".to_string()),
    Value::from(json!({"a": [1, 2.5, null], "b": {"c": true}})),
    Value::Tuple(vec![Value::Int(1), Value::None]),
    Value::Object(
      OpaqueObject::new("openalea.mtg.MTG", "<MTG with 3 vertices>")
        .with_field("vertices", Value::Int(3)),
    ),
  ];

  for value in values {
    let ref_id = cache.store(&value).unwrap();
    assert_eq!(cache.load(&ref_id).unwrap(), value);
  }
}

#[test]
fn test_scene_json_round_trip() {
  let (cache, _temp) = create_test_cache();
  let scene = Scene::new(vec![Shape::new(
    Geometry::cuboid(1.0, 1.0, 1.0),
    Material::default(),
  )]);
  let scene_json = scene_to_json(&scene);

  let ref_id = cache.store_scene_json_new(&scene_json).unwrap();
  assert_eq!(cache.load_scene_json(&ref_id).unwrap(), Some(scene_json));
}

#[test]
fn test_namespaces_do_not_collide() {
  let (cache, _temp) = create_test_cache();
  let ref_id = cache.store(&Value::Int(1)).unwrap();

  assert_eq!(cache.load_scene_json(&ref_id).unwrap(), None);

  let scene_id = cache.store_scene_json_new(&json!({"objects": []})).unwrap();
  assert!(cache.load(&scene_id).unwrap_err().is_not_found());
}

#[test]
fn test_missing_entries() {
  let (cache, _temp) = create_test_cache();

  let err = cache.load("0123456789abcdef0123456789abcdef").unwrap_err();
  assert!(matches!(err, CacheError::NotFound(ref ref_id) if ref_id == "0123456789abcdef0123456789abcdef"));
  assert_eq!(cache.load_scene_json("missing").unwrap(), None);
}

#[test]
fn test_ref_ids_are_unique() {
  let (cache, _temp) = create_test_cache();
  let mut seen = HashSet::new();
  for _ in 0..10_000 {
    let ref_id = cache.store(&Value::None).unwrap();
    assert!(seen.insert(ref_id));
  }
}

#[test]
fn test_cleanup_removes_expired_entries() {
  let (cache, _temp) = create_test_cache();
  let expired = cache.store(&Value::Int(1)).unwrap();
  let expired_scene = cache.store_scene_json_new(&json!({"objects": []})).unwrap();
  let fresh = cache.store(&Value::Int(2)).unwrap();

  age_file(&cache.dir().join(format!("{}.bin", expired)));
  age_file(&cache.dir().join(format!("{}.scene.json", expired_scene)));

  let removed = cache.cleanup(Some(1)).unwrap();
  assert!(removed >= 2);

  assert!(matches!(cache.load(&expired), Err(CacheError::NotFound(_))));
  assert_eq!(cache.load_scene_json(&expired_scene).unwrap(), None);
  assert_eq!(cache.load(&fresh).unwrap(), Value::Int(2));
}

#[test]
fn test_cleanup_non_positive_ttl_is_noop() {
  let (cache, _temp) = create_test_cache();
  let ref_id = cache.store(&Value::Int(1)).unwrap();
  age_file(&cache.dir().join(format!("{}.bin", ref_id)));

  assert_eq!(cache.cleanup(Some(0)).unwrap(), 0);
  assert_eq!(cache.cleanup(Some(-10)).unwrap(), 0);
  assert_eq!(cache.load(&ref_id).unwrap(), Value::Int(1));
}

#[test]
fn test_cleanup_uses_configured_ttl() {
  let temp_dir = tempfile::tempdir().unwrap();
  let cache = ObjectCache::new(CacheConfig::new(temp_dir.path()).with_ttl(60));
  let ref_id = cache.store(&Value::Int(1)).unwrap();
  age_file(&cache.dir().join(format!("{}.bin", ref_id)));

  assert_eq!(cache.cleanup(None).unwrap(), 1);
  assert_eq!(cache.cleanup(None).unwrap(), 0);
}

#[test]
fn test_cleanup_ignores_foreign_files() {
  let (cache, _temp) = create_test_cache();
  cache.store(&Value::None).unwrap();
  let foreign = cache.dir().join("notes.txt");
  std::fs::write(&foreign, "keep me").unwrap();
  age_file(&foreign);

  assert_eq!(cache.cleanup(Some(1)).unwrap(), 0);
  assert!(foreign.exists());
}
