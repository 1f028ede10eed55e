//! Webalea Visualizer
//!
//! Turns the data a client holds for a node (inline scene JSON, execution
//! outputs carrying cache reference markers, or a raw value) into a scene
//! document ready for rendering.
//!
//! [`parse_visualization_payload`] decides what the payload offers and
//! [`VisualizationResolver`] fetches or builds the scene, going through the
//! object cache for references.

mod error;
mod payload;
mod resolver;

pub use error::VisualizerError;
pub use payload::{SceneRefData, parse_visualization_payload};
pub use resolver::{EMPTY_SCENE_WARNING, VisualizationResolver, VisualizationResponse};
