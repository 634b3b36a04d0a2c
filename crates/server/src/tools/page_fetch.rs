//! page_fetch tool implementation.
//!
//! Routes one page request through the offline cache manager, exactly as the
//! page's own request would be.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use lobby_client::fetch::canonicalize;
use lobby_client::{OfflineCache, PageRequest, RequestMode};
use lobby_core::Error;
use reqwest::Method;

use super::json_result;

/// Input parameters for page_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PageFetchParams {
    /// The absolute URL to request.
    pub url: String,

    /// HTTP method (default: GET). Only GET requests are ever cached.
    #[serde(default = "default_method")]
    pub method: String,

    /// Request mode: "navigate", "same-origin", "no-cors" (default) or "cors".
    #[serde(default)]
    pub mode: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for page_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PageFetchOutput {
    /// The URL requested.
    pub url: String,
    /// The final URL after redirects.
    pub final_url: String,
    /// HTTP status code of the served response.
    pub status: u16,
    /// Where the response came from: network, cache, fallback or pass_through.
    pub source: String,
    /// How the request was classified.
    pub class: String,
    /// Content-Type header.
    pub content_type: Option<String>,
    /// Response body decoded as UTF-8 (lossy).
    pub body: String,
    /// Time taken to fetch in milliseconds (0 when served from the store).
    pub fetch_ms: u64,
}

/// Implementation of the page_fetch tool.
pub async fn page_fetch_impl(cache: &OfflineCache, params: PageFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let url = canonicalize(&params.url).map_err(|e| Error::InvalidUrl(format!("{}: {e}", params.url)))?;
    let method = Method::from_bytes(params.method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| Error::InvalidInput(format!("invalid method: {}", params.method)))?;
    let mode = match params.mode.as_deref() {
        Some(mode) => mode.parse::<RequestMode>()?,
        None => RequestMode::default(),
    };

    let request = PageRequest::get(url).with_method(method).with_mode(mode);
    let served = cache.handle(request).await?;

    let output = PageFetchOutput {
        url: served.response.url.to_string(),
        final_url: served.response.final_url.to_string(),
        status: served.response.status.as_u16(),
        source: label(&served.source),
        class: label(&served.class),
        content_type: served.response.content_type.clone(),
        body: String::from_utf8_lossy(&served.response.bytes).to_string(),
        fetch_ms: served.response.fetch_ms,
    };

    json_result(&output)
}

/// The serde name of a unit enum variant.
fn label<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}
