//! cache_stores tool implementation.
//!
//! Lists every cache store with its entry count.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use lobby_client::OfflineCache;
use lobby_core::StoreInfo;

use crate::tools::json_result;

/// Output from the cache_stores tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheStoresOutput {
    /// Name of the store for the current generation.
    pub current: String,
    /// All stores, oldest first.
    pub stores: Vec<StoreInfo>,
}

/// Implementation of the cache_stores tool.
pub async fn stores_impl(cache: &OfflineCache) -> Result<CallToolResult, McpError> {
    let stores = cache.db().describe_stores().await?;
    let output = CacheStoresOutput { current: cache.store_name().to_string(), stores };
    json_result(&output)
}
