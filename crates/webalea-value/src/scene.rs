use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

/// An 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color3 {
  pub red: u8,
  pub green: u8,
  pub blue: u8,
}

impl Color3 {
  pub const fn new(red: u8, green: u8, blue: u8) -> Self {
    Self { red, green, blue }
  }

  /// Components scaled to `[0, 1]`.
  pub fn normalized(&self) -> [f64; 3] {
    [
      f64::from(self.red) / 255.0,
      f64::from(self.green) / 255.0,
      f64::from(self.blue) / 255.0,
    ]
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
  pub ambient: Color3,
  /// 0.0 is opaque, 1.0 fully transparent.
  pub transparency: f64,
}

impl Material {
  pub fn new(ambient: Color3) -> Self {
    Self {
      ambient,
      transparency: 0.0,
    }
  }
}

impl Default for Material {
  fn default() -> Self {
    Self::new(Color3::new(200, 200, 200))
  }
}

/// Already-discretized geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
  /// Triangulated (or polygonal) surface.
  Mesh {
    vertices: Vec<[f64; 3]>,
    indices: Vec<Vec<u32>>,
  },
  Polyline {
    points: Vec<[f64; 3]>,
  },
  Text {
    string: String,
    position: [f64; 3],
  },
}

impl Geometry {
  pub fn kind(&self) -> &'static str {
    match self {
      Geometry::Mesh { .. } => "Mesh",
      Geometry::Polyline { .. } => "Polyline",
      Geometry::Text { .. } => "Text",
    }
  }

  /// Axis-aligned box centered on the origin.
  pub fn cuboid(half_x: f64, half_y: f64, half_z: f64) -> Self {
    let mut vertices = Vec::with_capacity(8);
    for z in [-half_z, half_z] {
      for y in [-half_y, half_y] {
        for x in [-half_x, half_x] {
          vertices.push([x, y, z]);
        }
      }
    }
    let indices = [
      [0, 2, 1],
      [1, 2, 3],
      [4, 5, 6],
      [5, 7, 6],
      [0, 1, 4],
      [1, 5, 4],
      [2, 6, 3],
      [3, 6, 7],
      [0, 4, 2],
      [2, 4, 6],
      [1, 3, 5],
      [3, 7, 5],
    ]
    .into_iter()
    .map(|face| face.to_vec())
    .collect();
    Geometry::Mesh { vertices, indices }
  }

  fn to_json(&self) -> serde_json::Value {
    match self {
      Geometry::Mesh { vertices, indices } => json!({
        "type": "mesh",
        "vertices": vertices,
        "indices": indices,
      }),
      Geometry::Polyline { points } => json!({
        "type": "line",
        "vertices": points,
      }),
      Geometry::Text { string, position } => json!({
        "type": "text",
        "text": string,
        "position": position,
      }),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
  pub geometry: Geometry,
  pub material: Material,
}

impl Shape {
  pub fn new(geometry: Geometry, material: Material) -> Self {
    Self { geometry, material }
  }
}

/// An ordered collection of shapes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
  pub shapes: Vec<Shape>,
}

impl Scene {
  pub fn new(shapes: Vec<Shape>) -> Self {
    Self { shapes }
  }

  pub fn len(&self) -> usize {
    self.shapes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.shapes.is_empty()
  }

  pub fn add(&mut self, shape: Shape) {
    self.shapes.push(shape);
  }
}

/// Render a scene as the `{"objects": [...]}` document the 3D viewer loads.
///
/// Every shape produces one object with a fresh id. Text shapes become
/// positioned labels; everything else carries geometry, material and an
/// identity transform.
pub fn scene_to_json(scene: &Scene) -> serde_json::Value {
  let objects: Vec<serde_json::Value> = scene.shapes.iter().map(shape_to_json).collect();
  info!(
    shape_count = scene.len(),
    object_count = objects.len(),
    "serialized scene"
  );
  json!({ "objects": objects })
}

fn shape_to_json(shape: &Shape) -> serde_json::Value {
  let id = uuid::Uuid::new_v4().to_string();
  if let Geometry::Text { string, position } = &shape.geometry {
    return json!({
      "id": id,
      "objectType": "text",
      "text": string,
      "position": position,
    });
  }

  let geometry = shape.geometry.to_json();
  json!({
    "id": id,
    "objectType": geometry["type"],
    "geometry": geometry,
    "material": {
      "color": shape.material.ambient.normalized(),
      "opacity": 1.0 - shape.material.transparency,
    },
    "transform": {
      "position": [0, 0, 0],
      "rotation": [0, 0, 0],
      "scale": [1, 1, 1],
    },
  })
}

/// Rebuild a scene from a document produced by [`scene_to_json`].
///
/// Returns `None` when the document has no `objects` list or any object
/// cannot be read back. Object ids and transforms are not preserved.
pub fn scene_from_json(scene_json: &serde_json::Value) -> Option<Scene> {
  let objects = scene_json.get("objects")?.as_array()?;
  let shapes = objects
    .iter()
    .map(shape_from_json)
    .collect::<Option<Vec<_>>>()?;
  Some(Scene::new(shapes))
}

fn shape_from_json(object: &serde_json::Value) -> Option<Shape> {
  if object.get("objectType").and_then(|t| t.as_str()) == Some("text") {
    let geometry = Geometry::Text {
      string: object.get("text")?.as_str()?.to_string(),
      position: point_from_json(object.get("position")?)?,
    };
    return Some(Shape::new(geometry, Material::default()));
  }

  let geometry_json = object.get("geometry")?;
  let vertices = geometry_json
    .get("vertices")?
    .as_array()?
    .iter()
    .map(point_from_json)
    .collect::<Option<Vec<_>>>()?;
  let geometry = match geometry_json.get("type")?.as_str()? {
    "line" => Geometry::Polyline { points: vertices },
    "mesh" => {
      let indices = geometry_json
        .get("indices")?
        .as_array()?
        .iter()
        .map(|face| {
          face
            .as_array()?
            .iter()
            .map(|i| i.as_u64().and_then(|i| u32::try_from(i).ok()))
            .collect::<Option<Vec<_>>>()
        })
        .collect::<Option<Vec<_>>>()?;
      Geometry::Mesh { vertices, indices }
    }
    _ => return None,
  };

  let material_json = object.get("material");
  let channel = |i: usize| {
    material_json
      .and_then(|m| m.get("color"))
      .and_then(|c| c.get(i))
      .and_then(|c| c.as_f64())
      .map(|c| (c * 255.0).round().clamp(0.0, 255.0) as u8)
  };
  let mut material = Material::default();
  if let (Some(red), Some(green), Some(blue)) = (channel(0), channel(1), channel(2)) {
    material.ambient = Color3::new(red, green, blue);
  }
  if let Some(opacity) = material_json.and_then(|m| m.get("opacity")).and_then(|o| o.as_f64()) {
    material.transparency = 1.0 - opacity;
  }
  Some(Shape::new(geometry, material))
}

fn point_from_json(point: &serde_json::Value) -> Option<[f64; 3]> {
  let point = point.as_array()?;
  if point.len() != 3 {
    return None;
  }
  Some([point[0].as_f64()?, point[1].as_f64()?, point[2].as_f64()?])
}

/// Length of the `objects` list of a serialized scene, zero when absent.
pub fn scene_object_count(scene_json: &serde_json::Value) -> usize {
  scene_json
    .get("objects")
    .and_then(|objects| objects.as_array())
    .map(|objects| objects.len())
    .unwrap_or(0)
}
