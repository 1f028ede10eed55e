//! Webalea Value
//!
//! Values produced and consumed by registry nodes. Unlike the JSON exchanged
//! with the editor, these can carry things JSON cannot: tuples, array-likes,
//! 3D scenes and opaque package objects. The serializer in `webalea-runtime`
//! turns them into JSON-safe payloads, storing what cannot be inlined in the
//! object cache.

mod scene;
mod value;

pub use scene::{
  Color3, Geometry, Material, Scene, Shape, scene_from_json, scene_object_count, scene_to_json,
};
pub use value::{NdArray, OpaqueObject, Value};
