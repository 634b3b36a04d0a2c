//! cache_install and cache_activate tool implementations.
//!
//! Let a host re-run provisioning or activation without restarting.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use lobby_client::OfflineCache;

use super::json_result;

/// Output from the cache_install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheInstallOutput {
    /// The store that was provisioned.
    pub store: String,
    /// URLs now cached, in manifest order.
    pub stored: Vec<String>,
    /// Locators that could not be cached, with the reason.
    pub failed: Vec<FailedLocatorOutput>,
    /// Lifecycle state after install.
    pub state: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FailedLocatorOutput {
    pub locator: String,
    pub reason: String,
}

/// Output from the cache_activate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheActivateOutput {
    /// The current store.
    pub store: String,
    /// Stale stores that were deleted.
    pub deleted: Vec<String>,
    /// Lifecycle state after activation.
    pub state: String,
}

/// Implementation of the cache_install tool.
pub async fn install_impl(cache: &OfflineCache) -> Result<CallToolResult, McpError> {
    let report = cache.install().await?;
    let output = CacheInstallOutput {
        store: report.store,
        stored: report.stored,
        failed: report
            .failed
            .into_iter()
            .map(|f| FailedLocatorOutput { locator: f.locator, reason: f.reason })
            .collect(),
        state: cache.state().await.to_string(),
    };
    json_result(&output)
}

/// Implementation of the cache_activate tool.
pub async fn activate_impl(cache: &OfflineCache) -> Result<CallToolResult, McpError> {
    let report = cache.activate().await?;
    let output = CacheActivateOutput { store: report.store, deleted: report.deleted, state: cache.state().await.to_string() };
    json_result(&output)
}
