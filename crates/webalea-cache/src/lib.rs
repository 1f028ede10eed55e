//! Webalea Cache
//!
//! A disk-backed store for node results that are too large or too opaque to
//! travel inline in an execution response. Entries are addressed by random
//! reference ids handed back to API callers, and live in two namespaces:
//!
//! - raw values, bincode-encoded, stored as `<id>.bin`
//! - serialized scene documents, stored as `<id>.scene.json`
//!
//! Entries expire by file modification time; see [`ObjectCache::cleanup`].

mod config;
mod error;
mod store;

pub use config::{CacheConfig, DEFAULT_TTL_SECONDS};
pub use error::CacheError;
pub use store::ObjectCache;
