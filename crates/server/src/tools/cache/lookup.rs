//! cache_lookup tool implementation.
//!
//! Reports the stored entry for a URL in the current store, without the body.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use lobby_client::OfflineCache;
use lobby_client::fetch::{cache_key_url, canonicalize};
use lobby_core::Error;

use crate::tools::json_result;

/// Parameters for the cache_lookup tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheLookupParams {
    /// The absolute URL to look up.
    pub url: String,
}

/// Output from the cache_lookup tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheLookupOutput {
    pub store: String,
    pub url: String,
    pub key: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    /// Stored body size in bytes.
    pub size: usize,
    /// RFC 3339 timestamp of the last write.
    pub stored_at: String,
}

/// Implementation of the cache_lookup tool.
pub async fn lookup_impl(cache: &OfflineCache, params: CacheLookupParams) -> Result<CallToolResult, McpError> {
    let url = canonicalize(&params.url).map_err(|e| Error::InvalidUrl(format!("{}: {e}", params.url)))?;
    let key_url = cache_key_url(&url);
    let store = cache.store_name();

    let entry = cache
        .db()
        .match_entry(store, "GET", &key_url)
        .await?
        .ok_or_else(|| Error::CacheMiss(key_url.clone()))?;

    let output = CacheLookupOutput {
        store: store.to_string(),
        key: entry.key(),
        url: entry.url,
        status_code: entry.status_code,
        content_type: entry.content_type,
        size: entry.body.len(),
        stored_at: entry.stored_at,
    };
    json_result(&output)
}
