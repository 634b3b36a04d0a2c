//! Cache-related MCP tools.
//!
//! This module provides tools for inspecting and pruning the SQLite cache stores.

pub mod lookup;
pub mod purge;
pub mod stores;

pub use lookup::{CacheLookupParams, lookup_impl};
pub use purge::{CachePurgeParams, purge_impl};
pub use stores::stores_impl;
