//! Core types and shared functionality for lobby-cache.
//!
//! This crate provides:
//! - Versioned cache stores with a SQLite backend
//! - Unified error types
//! - Layered configuration

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, CachedEntry, StoreInfo};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
