//! cache_purge tool implementation.
//!
//! Deletes a stale store outright, or entries whose URL starts with a prefix.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use lobby_client::OfflineCache;
use lobby_core::Error;

use crate::tools::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Store to act on. Without `url_prefix` the whole store is deleted;
    /// the current store cannot be deleted this way.
    pub store: Option<String>,

    /// Delete entries whose URL starts with this prefix (current store
    /// unless `store` is given).
    pub url_prefix: Option<String>,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Store that was acted on.
    pub store: String,
    /// Whether the whole store was deleted.
    pub store_deleted: bool,
    /// Number of entries deleted by prefix.
    pub deleted: u64,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(cache: &OfflineCache, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    let db = cache.db();
    let current = cache.store_name();

    let output = match (params.store, params.url_prefix) {
        (None, None) => {
            return Err(Error::InvalidInput("At least one of store or url_prefix must be specified".to_string()).into());
        }
        (_, Some(prefix)) if prefix.is_empty() => {
            return Err(Error::InvalidInput("url_prefix cannot be empty".to_string()).into());
        }
        (Some(store), None) => {
            if store == current {
                return Err(Error::InvalidInput(format!("{store} is the current store")).into());
            }
            if !db.delete_store(&store).await? {
                return Err(Error::StoreNotFound(store).into());
            }
            tracing::info!(store = %store, "purged cache store");
            CachePurgeOutput { store, store_deleted: true, deleted: 0 }
        }
        (store, Some(prefix)) => {
            let store = store.unwrap_or_else(|| current.to_string());
            if !db.has_store(&store).await? {
                return Err(Error::StoreNotFound(store).into());
            }
            let deleted = db.purge_entries_by_prefix(&store, &prefix).await?;
            tracing::info!(store = %store, prefix = %prefix, deleted, "purged cache entries");
            CachePurgeOutput { store, store_deleted: false, deleted }
        }
    };

    json_result(&output)
}
