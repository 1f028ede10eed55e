//! In-process node evaluation against the builtin registry.

use serde_json::{Map, Value as JsonValue, json};
use webalea_cache::{CacheConfig, ObjectCache};
use webalea_registry::{BuiltinRegistry, NodeRegistry};
use webalea_runtime::{InputResolver, NodeEvaluator, NodeExecutor, marker};
use webalea_value::Value;

fn create_test_evaluator() -> (NodeEvaluator<BuiltinRegistry>, tempfile::TempDir) {
  let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
  let cache = ObjectCache::new(CacheConfig::new(temp_dir.path().join("cache")));
  (NodeEvaluator::new(BuiltinRegistry::new(), cache), temp_dir)
}

fn inputs(value: JsonValue) -> Map<String, JsonValue> {
  match value {
    JsonValue::Object(map) => map,
    _ => panic!("inputs fixture must be an object"),
  }
}

#[test]
fn test_addition() {
  let (evaluator, _temp) = create_test_evaluator();
  let result = evaluator.run("openalea.math", "addition", &inputs(json!({"a": 5, "b": 3})));

  assert!(result.success);
  assert!(result.warnings.is_empty());
  assert_eq!(
    serde_json::to_value(&result.outputs).unwrap(),
    json!([{"index": 0, "name": "result", "value": 8, "type": "int"}])
  );
}

#[test]
fn test_short_package_name_and_positional_inputs() {
  let (evaluator, _temp) = create_test_evaluator();
  let result = evaluator.run("math", "subtraction", &inputs(json!({"0": 10, "1": 4.5})));

  assert!(result.success);
  assert_eq!(result.outputs[0].value, json!(5.5));
  assert_eq!(result.outputs[0].value_type, "float");
}

#[test]
fn test_bad_input_is_a_warning() {
  let (evaluator, _temp) = create_test_evaluator();
  let result = evaluator.run(
    "openalea.math",
    "addition",
    &inputs(json!({"a": 5, "bad_key": 1})),
  );

  assert!(result.success);
  assert_eq!(result.outputs[0].value, json!(5));
  assert_eq!(result.warnings.len(), 1);
  assert!(result.warnings[0].starts_with("Failed to set input 'bad_key':"));
}

#[test]
fn test_input_report_names_failures() {
  let (evaluator, _temp) = create_test_evaluator();
  let package = evaluator.registry().get_package("openalea.math").unwrap();
  let mut node = package.get("addition").unwrap().instantiate().unwrap();

  let report = evaluator.apply_inputs(node.as_mut(), &inputs(json!({"a": 1, "b": "text", "5": 2})));

  assert!(!report.is_complete());
  assert_eq!(report.applied, vec!["a".to_string()]);
  let failed: Vec<&str> = report.failures.iter().map(|f| f.key.as_str()).collect();
  assert_eq!(failed, vec!["5", "b"]);
  assert_eq!(report.warnings().len(), 2);
}

#[test]
fn test_package_not_found() {
  let (evaluator, _temp) = create_test_evaluator();
  let result = evaluator.run("openalea.nope", "addition", &Map::new());

  assert!(!result.success);
  assert_eq!(result.error.as_deref(), Some("Package 'openalea.nope' not found"));
}

#[test]
fn test_node_not_found() {
  let (evaluator, _temp) = create_test_evaluator();
  let result = evaluator.run("openalea.math", "sqrt", &Map::new());

  assert!(!result.success);
  assert_eq!(
    result.error.as_deref(),
    Some("Node 'sqrt' not found in 'openalea.math'")
  );
}

#[test]
fn test_evaluation_error() {
  let (evaluator, _temp) = create_test_evaluator();
  let result = evaluator.run("openalea.math", "division", &inputs(json!({"a": 1, "b": 0})));

  assert!(!result.success);
  assert_eq!(result.error.as_deref(), Some("division by zero"));
}

#[test]
fn test_scene_output_is_cached() {
  let (evaluator, _temp) = create_test_evaluator();
  let result = evaluator.run("openalea.plantgl", "box", &inputs(json!({"size_x": 2.0})));

  assert!(result.success);
  let output = &result.outputs[0];
  assert_eq!(output.name, "shape");
  assert_eq!(output.value_type, "Shape");
  assert_eq!(marker::marker_type(&output.value), Some(marker::SCENE_JSON_REF));

  // The marker resolves back to a scene for the next node.
  let resolved = InputResolver::new(evaluator.cache())
    .resolve(&output.value)
    .unwrap();
  let Value::Scene(scene) = resolved else {
    panic!("expected a scene, got {:?}", resolved);
  };
  assert_eq!(scene.len(), 1);
}

#[test]
fn test_array_output_is_a_list() {
  let (evaluator, _temp) = create_test_evaluator();
  let result = evaluator.run("openalea.data", "array", &inputs(json!({"values": [1, 2, 3]})));

  assert!(result.success);
  assert_eq!(result.outputs[0].value, json!([1.0, 2.0, 3.0]));
  assert_eq!(result.outputs[0].value_type, "ndarray");
}

#[tokio::test]
async fn test_executor_trait() {
  let (evaluator, _temp) = create_test_evaluator();
  let result = evaluator
    .execute_node("openalea.math", "multiplication", inputs(json!({"a": 6, "b": 7})))
    .await;

  assert!(result.success);
  assert_eq!(result.outputs[0].value, json!(42));
}
