//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the offline cache manager.
use std::sync::Arc;

use crate::tools::{CacheLookupParams, CachePurgeParams, PageFetchParams};
use crate::tools::{activate_impl, install_impl, lookup_impl, page_fetch_impl, purge_impl, stores_impl};
use lobby_client::OfflineCache;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for lobby-cache.
#[derive(Clone)]
pub struct LobbyCacheServer {
    cache: Arc<OfflineCache>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl LobbyCacheServer {
    /// Create a new server handler around an installed manager.
    pub fn new(cache: Arc<OfflineCache>) -> Self {
        Self { cache, tool_router: Self::tool_router() }
    }

    /// Route one request through the offline cache.
    #[tool(
        description = "Request a URL through the offline cache. Navigation and catalog data are network-first, same-origin assets cache-first, cross-origin requests pass through. Returns status, source, class and body."
    )]
    async fn page_fetch(&self, params: Parameters<PageFetchParams>) -> Result<CallToolResult, McpError> {
        page_fetch_impl(&self.cache, params.0).await
    }

    #[tool(description = "Re-run install: precache every manifest locator into the current generation's store.")]
    async fn cache_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.cache).await
    }

    #[tool(description = "Run activation: delete every cache store except the current generation's.")]
    async fn cache_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.cache).await
    }

    #[tool(description = "List cache stores with entry counts and the current store name.")]
    async fn cache_stores(&self) -> Result<CallToolResult, McpError> {
        stores_impl(&self.cache).await
    }

    #[tool(description = "Look up the stored entry for a URL in the current store. Returns metadata, not the body.")]
    async fn cache_lookup(&self, params: Parameters<CacheLookupParams>) -> Result<CallToolResult, McpError> {
        lookup_impl(&self.cache, params.0).await
    }

    #[tool(description = "Delete a stale cache store, or entries whose URL starts with a prefix.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(&self.cache, params.0).await
    }
}

impl ServerHandler for LobbyCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "lobby-cache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
