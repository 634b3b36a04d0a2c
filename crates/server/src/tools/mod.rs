//! MCP tool implementations.
//!
//! This module contains all tools exposed by the lobby-cache server.

pub mod cache;
pub mod lifecycle;
pub mod page_fetch;

#[cfg(test)]
pub(crate) mod test_support;

pub use cache::{CacheLookupParams, CachePurgeParams, lookup_impl, purge_impl, stores_impl};
pub use lifecycle::{activate_impl, install_impl};
pub use page_fetch::{PageFetchParams, page_fetch_impl};

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use lobby_core::Error;

/// Render a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
