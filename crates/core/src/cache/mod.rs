//! SQLite-backed cache stores for offline page assets.
//!
//! A cache store is a named, durable mapping from request identity to the
//! most recently stored response. Store names embed a generation
//! identifier so that a new deployment can drop every older generation in
//! one pass. This module supports:
//!
//! - Request identity keys using SHA-256 hashing
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Whole-store deletion with cascading entry removal

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod stores;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::CachedEntry;
pub use stores::StoreInfo;
