//! Client code for lobby-cache.
//!
//! This crate provides the network fetch pipeline and the offline cache
//! manager that routes page requests between the network and the store.

pub mod fetch;
pub mod offline;

pub use fetch::{CacheMode, FetchClient, FetchConfig, FetchResponse, Fetcher, PageRequest, RequestMode};
pub use offline::{
    ActivateReport, InstallReport, OfflineCache, OfflineConfig, RequestClass, ServedResponse, Source, WorkerState,
};
