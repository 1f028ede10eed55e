use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::scene::{Geometry, Material, Scene, Shape};

/// A dense numeric array with a row-major shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NdArray {
  pub shape: Vec<usize>,
  pub data: Vec<f64>,
}

impl NdArray {
  pub fn new(shape: Vec<usize>, data: Vec<f64>) -> Self {
    Self { shape, data }
  }

  /// A one-dimensional array.
  pub fn vector(data: Vec<f64>) -> Self {
    Self {
      shape: vec![data.len()],
      data,
    }
  }

  /// Nested JSON lists following the array's shape.
  ///
  /// An inconsistent shape is flattened to a single list.
  pub fn to_list(&self) -> serde_json::Value {
    let expected: usize = self.shape.iter().product();
    if self.shape.is_empty() || expected != self.data.len() {
      return serde_json::Value::Array(self.data.iter().map(|v| float_json(*v)).collect());
    }
    nest(&self.shape, &self.data)
  }
}

fn nest(shape: &[usize], data: &[f64]) -> serde_json::Value {
  match shape {
    [] | [_] => serde_json::Value::Array(data.iter().map(|v| float_json(*v)).collect()),
    [outer, rest @ ..] => {
      let stride: usize = rest.iter().product();
      serde_json::Value::Array(
        (0..*outer)
          .map(|i| nest(rest, &data[i * stride..(i + 1) * stride]))
          .collect(),
      )
    }
  }
}

fn float_json(v: f64) -> serde_json::Value {
  serde_json::Number::from_f64(v)
    .map(serde_json::Value::Number)
    .unwrap_or(serde_json::Value::Null)
}

/// A package object with no JSON representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpaqueObject {
  /// Fully qualified type name, e.g. `openalea.mtg.MTG`.
  pub type_name: String,
  /// Human-readable representation.
  pub summary: String,
  #[serde(default)]
  pub fields: BTreeMap<String, Value>,
}

impl OpaqueObject {
  pub fn new(type_name: impl Into<String>, summary: impl Into<String>) -> Self {
    Self {
      type_name: type_name.into(),
      summary: summary.into(),
      fields: BTreeMap::new(),
    }
  }

  pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
    self.fields.insert(key.into(), value);
    self
  }
}

/// A value flowing into or out of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
  None,
  Bool(bool),
  Int(i64),
  Float(f64),
  Str(String),
  List(Vec<Value>),
  Tuple(Vec<Value>),
  Map(BTreeMap<String, Value>),
  Array(NdArray),
  Scene(Scene),
  Shape(Shape),
  Geometry(Geometry),
  Object(OpaqueObject),
}

impl Value {
  pub fn is_none(&self) -> bool {
    matches!(self, Value::None)
  }

  pub fn from_json(json: serde_json::Value) -> Self {
    Self::from(json)
  }

  /// Plain JSON for values built only from JSON-representable parts.
  ///
  /// Tuples become lists. Returns `None` as soon as an array, scene or opaque
  /// object is encountered, or a float is not finite.
  pub fn to_json(&self) -> Option<serde_json::Value> {
    match self {
      Value::None => Some(serde_json::Value::Null),
      Value::Bool(b) => Some(serde_json::Value::Bool(*b)),
      Value::Int(i) => Some(serde_json::Value::from(*i)),
      Value::Float(x) => serde_json::Number::from_f64(*x).map(serde_json::Value::Number),
      Value::Str(s) => Some(serde_json::Value::String(s.clone())),
      Value::List(items) | Value::Tuple(items) => items
        .iter()
        .map(Value::to_json)
        .collect::<Option<Vec<_>>>()
        .map(serde_json::Value::Array),
      Value::Map(map) => map
        .iter()
        .map(|(k, v)| v.to_json().map(|v| (k.clone(), v)))
        .collect::<Option<serde_json::Map<_, _>>>()
        .map(serde_json::Value::Object),
      _ => None,
    }
  }

  /// The value as a renderable scene, if it is scene-like.
  ///
  /// Single shapes become a one-shape scene and bare geometry is wrapped in a
  /// shape with the default material.
  pub fn to_scene(&self) -> Option<Scene> {
    match self {
      Value::Scene(scene) => Some(scene.clone()),
      Value::Shape(shape) => Some(Scene::new(vec![shape.clone()])),
      Value::Geometry(geometry) => Some(Scene::new(vec![Shape::new(
        geometry.clone(),
        Material::default(),
      )])),
      _ => None,
    }
  }

  /// List conversion for array-like values.
  pub fn to_list(&self) -> Option<serde_json::Value> {
    match self {
      Value::Array(array) => Some(array.to_list()),
      _ => None,
    }
  }

  /// Short type name reported alongside execution outputs.
  pub fn type_name(&self) -> String {
    match self {
      Value::None => "None".to_string(),
      Value::Bool(_) => "boolean".to_string(),
      Value::Int(_) => "int".to_string(),
      Value::Float(_) => "float".to_string(),
      Value::Str(_) => "str".to_string(),
      Value::List(_) => "list".to_string(),
      Value::Tuple(_) => "tuple".to_string(),
      Value::Map(_) => "dict".to_string(),
      Value::Array(_) => "ndarray".to_string(),
      Value::Scene(_) => "Scene".to_string(),
      Value::Shape(_) => "Shape".to_string(),
      Value::Geometry(geometry) => geometry.kind().to_string(),
      Value::Object(object) => object
        .type_name
        .rsplit('.')
        .next()
        .unwrap_or("Object")
        .to_string(),
    }
  }

  /// Fully qualified type name used in cache reference markers.
  pub fn qualified_type_name(&self) -> String {
    match self {
      Value::Object(object) if !object.type_name.is_empty() => object.type_name.clone(),
      Value::Object(_) => "Object".to_string(),
      other => format!("webalea.{}", other.type_name()),
    }
  }
}

impl From<serde_json::Value> for Value {
  fn from(value: serde_json::Value) -> Self {
    match value {
      serde_json::Value::Null => Value::None,
      serde_json::Value::Bool(b) => Value::Bool(b),
      serde_json::Value::Number(n) => match n.as_i64() {
        Some(i) => Value::Int(i),
        None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
      },
      serde_json::Value::String(s) => Value::Str(s),
      serde_json::Value::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
      serde_json::Value::Object(map) => {
        Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
      }
    }
  }
}

impl From<i64> for Value {
  fn from(value: i64) -> Self {
    Value::Int(value)
  }
}

impl From<f64> for Value {
  fn from(value: f64) -> Self {
    Value::Float(value)
  }
}

impl From<bool> for Value {
  fn from(value: bool) -> Self {
    Value::Bool(value)
  }
}

impl From<&str> for Value {
  fn from(value: &str) -> Self {
    Value::Str(value.to_string())
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::None => write!(f, "None"),
      Value::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
      Value::Int(i) => write!(f, "{}", i),
      Value::Float(x) => write!(f, "{:?}", x),
      Value::Str(s) => write!(f, "{}", s),
      Value::List(items) => write_seq(f, "[", items, "]"),
      Value::Tuple(items) => write_seq(f, "(", items, ")"),
      Value::Map(map) => {
        write!(f, "{{")?;
        for (i, (k, v)) in map.iter().enumerate() {
          if i > 0 {
            write!(f, ", ")?;
          }
          write!(f, "'{}': {}", k, v)?;
        }
        write!(f, "}}")
      }
      Value::Array(array) => write!(f, "array(shape={:?})", array.shape),
      Value::Scene(scene) => write!(f, "<Scene with {} shapes>", scene.len()),
      Value::Shape(shape) => write!(f, "<Shape {}>", shape.geometry.kind()),
      Value::Geometry(geometry) => write!(f, "<{}>", geometry.kind()),
      Value::Object(object) => write!(f, "{}", object.summary),
    }
  }
}

fn write_seq(f: &mut fmt::Formatter<'_>, open: &str, items: &[Value], close: &str) -> fmt::Result {
  write!(f, "{}", open)?;
  for (i, item) in items.iter().enumerate() {
    if i > 0 {
      write!(f, ", ")?;
    }
    write!(f, "{}", item)?;
  }
  write!(f, "{}", close)
}
