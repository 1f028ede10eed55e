use serde_json::json;
use webalea_value::{Color3, Geometry, Material, Scene, Shape, Value};

use super::{arg, as_f64};
use crate::error::RegistryError;
use crate::memory::{MemoryPackage, SimpleFactory};

pub(super) fn package() -> MemoryPackage {
  MemoryPackage::new("openalea.plantgl")
    .with_node(
      SimpleFactory::new("box", |inputs| cuboid(inputs).map(|v| vec![v]))
        .with_description("Box centered on the origin, sized by its half extents")
        .with_inputs(json!([
          {"name": "size_x", "interface": "IFloat", "value": 0.5},
          {"name": "size_y", "interface": "IFloat", "value": 0.5},
          {"name": "size_z", "interface": "IFloat", "value": 0.5},
          {"name": "color", "interface": "ISequence"},
        ]))
        .with_outputs(json!(["shape"])),
    )
    .with_node(
      SimpleFactory::new("polyline", |inputs| polyline(arg(inputs, 0)).map(|v| vec![v]))
        .with_description("Polyline through a list of [x, y, z] points")
        .with_inputs(json!([{"name": "points", "interface": "ISequence"}]))
        .with_outputs(json!(["geometry"])),
    )
    .with_node(
      SimpleFactory::new("text", |inputs| label(inputs).map(|v| vec![v]))
        .with_description("Text label placed in the scene")
        .with_inputs(json!([
          {"name": "text", "interface": "IStr", "value": ""},
          {"name": "position", "interface": "ISequence"},
        ]))
        .with_outputs(json!(["shape"])),
    )
    .with_node(
      SimpleFactory::new("scene", |inputs| merge(inputs).map(|v| vec![v]))
        .with_description("Merge shapes, geometries and scenes into one scene")
        .with_inputs(json!(["a", "b", "c"]))
        .with_outputs(json!(["scene"])),
    )
}

fn evaluation(message: impl Into<String>) -> RegistryError {
  RegistryError::Evaluation(message.into())
}

fn point(value: &Value) -> Option<[f64; 3]> {
  match value {
    Value::List(items) | Value::Tuple(items) if items.len() == 3 => {
      Some([as_f64(&items[0])?, as_f64(&items[1])?, as_f64(&items[2])?])
    }
    _ => None,
  }
}

fn color(value: &Value) -> Result<Option<Color3>, RegistryError> {
  let channel = |v: &Value| as_f64(v).map(|c| c.clamp(0.0, 255.0) as u8);
  match value {
    Value::None => Ok(None),
    Value::List(items) | Value::Tuple(items) if items.len() == 3 => {
      match (channel(&items[0]), channel(&items[1]), channel(&items[2])) {
        (Some(r), Some(g), Some(b)) => Ok(Some(Color3::new(r, g, b))),
        _ => Err(evaluation("color channels must be numbers")),
      }
    }
    _ => Err(evaluation("color must be [r, g, b]")),
  }
}

fn cuboid(inputs: &[Value]) -> Result<Value, RegistryError> {
  let size = |i: usize| as_f64(arg(inputs, i)).unwrap_or(0.5);
  let material = color(arg(inputs, 3))?
    .map(Material::new)
    .unwrap_or_default();
  Ok(Value::Shape(Shape::new(
    Geometry::cuboid(size(0), size(1), size(2)),
    material,
  )))
}

fn polyline(points: &Value) -> Result<Value, RegistryError> {
  let (Value::List(items) | Value::Tuple(items)) = points else {
    return Err(evaluation("polyline expects a list of points"));
  };
  let points = items
    .iter()
    .map(point)
    .collect::<Option<Vec<_>>>()
    .ok_or_else(|| evaluation("polyline points must be [x, y, z]"))?;
  Ok(Value::Geometry(Geometry::Polyline { points }))
}

fn label(inputs: &[Value]) -> Result<Value, RegistryError> {
  let string = match arg(inputs, 0) {
    Value::Str(s) => s.clone(),
    Value::None => String::new(),
    other => other.to_string(),
  };
  let position = match arg(inputs, 1) {
    Value::None => [0.0, 0.0, 0.0],
    other => point(other).ok_or_else(|| evaluation("position must be [x, y, z]"))?,
  };
  Ok(Value::Shape(Shape::new(
    Geometry::Text { string, position },
    Material::default(),
  )))
}

fn merge(inputs: &[Value]) -> Result<Value, RegistryError> {
  let mut scene = Scene::default();
  for input in inputs {
    collect(input, &mut scene)?;
  }
  Ok(Value::Scene(scene))
}

fn collect(value: &Value, scene: &mut Scene) -> Result<(), RegistryError> {
  match value {
    Value::None => Ok(()),
    Value::List(items) | Value::Tuple(items) => {
      for item in items {
        collect(item, scene)?;
      }
      Ok(())
    }
    other => {
      let part = other
        .to_scene()
        .ok_or_else(|| evaluation(format!("cannot add '{}' to a scene", other.type_name())))?;
      scene.shapes.extend(part.shapes);
      Ok(())
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_box_with_color() {
    let inputs = vec![
      Value::Float(1.0),
      Value::Float(2.0),
      Value::Float(3.0),
      Value::List(vec![Value::Int(255), Value::Int(0), Value::Int(0)]),
    ];
    let Value::Shape(shape) = cuboid(&inputs).unwrap() else {
      panic!("expected shape");
    };
    assert_eq!(shape.material.ambient, Color3::new(255, 0, 0));
    assert_eq!(shape.geometry.kind(), "Mesh");
  }

  #[test]
  fn test_polyline_validates_points() {
    let good = Value::List(vec![
      Value::List(vec![Value::Int(0), Value::Int(0), Value::Int(0)]),
      Value::Tuple(vec![Value::Int(1), Value::Float(0.5), Value::Int(0)]),
    ]);
    assert!(matches!(
      polyline(&good).unwrap(),
      Value::Geometry(Geometry::Polyline { ref points }) if points.len() == 2
    ));

    let bad = Value::List(vec![Value::List(vec![Value::Int(0)])]);
    assert!(polyline(&bad).is_err());

    let tuple = Value::Tuple(vec![Value::List(vec![Value::Int(0), Value::Int(1), Value::Int(2)])]);
    assert!(matches!(
      polyline(&tuple).unwrap(),
      Value::Geometry(Geometry::Polyline { ref points }) if points.len() == 1
    ));
    assert!(polyline(&Value::Int(3)).is_err());
  }

  #[test]
  fn test_merge_flattens_scene_likes() {
    let shape = cuboid(&[]).unwrap();
    let text = label(&[Value::from("tip")]).unwrap();
    let merged = merge(&[shape.clone(), Value::List(vec![text, shape]), Value::None]).unwrap();
    let Value::Scene(scene) = merged else {
      panic!("expected scene");
    };
    assert_eq!(scene.len(), 3);
    assert!(merge(&[Value::Int(1)]).is_err());
  }
}
