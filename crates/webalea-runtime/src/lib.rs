//! Webalea Runtime
//!
//! Executes registry nodes and composite graphs of nodes.
//!
//! - [`ValueSerializer`] / [`InputResolver`] convert node values to and from
//!   the JSON exchanged with callers, storing what cannot be inlined in the
//!   object cache and leaving reference markers in its place.
//! - [`NodeEvaluator`] runs one node in-process against a registry.
//! - [`SubprocessRunner`] runs each request in a separate worker process with
//!   a wall-clock timeout, so a crashing or hanging node cannot take the
//!   caller down.
//! - [`CompositeExecutor`] evaluates a graph of nodes in dependency order on
//!   top of any [`NodeExecutor`].

mod composite;
mod error;
mod evaluator;
mod executor;
pub mod marker;
mod resolver;
mod result;
mod serializer;
mod subprocess;
mod worker;

pub use composite::{CompositeExecutor, parse_output_index};
pub use error::{CompositeError, RuntimeError};
pub use evaluator::{InputFailure, InputReport, NodeEvaluator};
pub use executor::NodeExecutor;
pub use resolver::InputResolver;
pub use result::{ExecutionResult, NodeOutput, json_type_name};
pub use serializer::{DEFAULT_MAX_DEPTH, ValueSerializer};
pub use subprocess::{DEFAULT_TIMEOUT, SubprocessRunner};
pub use worker::{WorkerRequest, handle_request, serve};
