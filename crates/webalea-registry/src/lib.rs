//! Webalea Registry
//!
//! The node registry is the boundary between the execution core and the
//! packages that actually implement nodes. The core only needs to:
//!
//! - resolve a package by name ([`NodeRegistry`])
//! - find a node factory in it ([`Package`])
//! - instantiate, feed, evaluate and read a node ([`NodeFactory`], [`Node`])
//!
//! Port descriptors arrive in loosely shaped JSON and are parsed defensively
//! by [`PortDescriptor::from_json`].
//!
//! [`BuiltinRegistry`] provides a small set of math, data and geometry
//! packages so a worker can run without any external packages installed.

mod builtin;
mod error;
mod inspect;
mod memory;
mod names;
mod port;
mod registry;

pub use builtin::BuiltinRegistry;
pub use error::RegistryError;
pub use inspect::{NodeDescription, PackageDescription, describe_package, list_packages};
pub use memory::{MemoryPackage, MemoryRegistry, NodeFn, SimpleFactory};
pub use names::normalize_package_name;
pub use port::{PortDescriptor, output_name};
pub use registry::{InputKey, Node, NodeFactory, NodeRegistry, Package};
