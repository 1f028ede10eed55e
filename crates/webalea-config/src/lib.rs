//! Webalea Config
//!
//! This crate contains the serializable request and graph types exchanged
//! between the visual editor and the execution core. They are deliberately
//! lenient: every field the editor may omit is optional, and mapping entries
//! are normalized from the several shapes the editor has produced over time.
//!
//! - [`NodeSpec`]: a single node execution request.
//! - [`GraphNode`] / [`Edge`]: the nodes and connections of a graph.
//! - [`CompositeNode`]: a graph exposed as one node with its own ports.
//! - [`Mapping`]: a normalized composite-boundary mapping entry.

mod composite;
mod graph;
mod mapping;
mod node;

pub use composite::{CompositeGraph, CompositeInput, CompositeNode, CompositeOutputDef};
pub use graph::{Edge, GraphNode, NodeData, PortDef};
pub use mapping::{Mapping, MappingTarget, normalize_mappings};
pub use node::{NodeInput, NodeSpec};
