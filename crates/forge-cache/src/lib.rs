//! Forge Cache - read-through caching of project reads
//!
//! Entries expire on a short TTL; pipeline writes also evict them explicitly
//! through [`CacheInvalidator`]. Correctness is best-effort, not linearizable
//! with the store.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod project_cache;

pub use project_cache::{CacheInvalidator, CacheStats, ListKey, ProjectCache};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
