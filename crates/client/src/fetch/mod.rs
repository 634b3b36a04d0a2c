//! Network side of the offline cache.
//!
//! ### Requests
//! - `PageRequest` carries method, URL, navigation mode and cache mode.
//! - `CacheMode::Reload` sends `Cache-Control: no-cache` so install-time
//!   provisioning never picks up a stale intermediary copy.
//!
//! ### Responses
//! - Any HTTP status is a response, not an error; callers decide what a
//!   non-2xx means. Only transport failures become `Error::FetchFailed`.
//! - Bodies are `Bytes`, so the caller's copy and the stored copy are
//!   independent.
//!
//! ### URL handling
//! - Locators resolve against the scope URL; fragments never reach a key.

pub mod request;
pub mod url;

use bytes::Bytes;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode, Url};
use std::time::{Duration, Instant};

pub use request::{CacheMode, PageRequest, RequestMode};
pub use self::url::{UrlError, cache_key_url, canonicalize, is_same_origin, resolve_locator};

use lobby_core::{AppConfig, CachedEntry, Error};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "lobby-cache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "lobby-cache/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl FetchConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// Response from a fetch or from the cache store.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub bytes: Bytes,
    /// Response headers
    pub headers: HeaderMap,
    /// Time taken to fetch in milliseconds (0 when read from the store)
    pub fetch_ms: u64,
}

impl FetchResponse {
    /// Copy this response into a store entry keyed by `request`.
    pub fn to_entry(&self, request: &PageRequest) -> CachedEntry {
        let headers: Vec<(String, String)> = self
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        let mut entry = CachedEntry::new(
            request.method.as_str(),
            &cache_key_url(&request.url),
            self.status.as_u16(),
            self.bytes.to_vec(),
        );
        entry.content_type = self.content_type.clone();
        entry.headers_json = serde_json::to_string(&headers).ok();
        entry
    }

    /// Rebuild a response from a store entry.
    ///
    /// Headers that no longer parse are dropped rather than failing the read.
    pub fn from_entry(entry: CachedEntry) -> Result<Self, Error> {
        let url = Url::parse(&entry.url).map_err(|e| Error::CorruptEntry(format!("{}: {e}", entry.url)))?;
        let status = StatusCode::from_u16(entry.status_code)
            .map_err(|e| Error::CorruptEntry(format!("{}: {e}", entry.url)))?;

        let mut headers = HeaderMap::new();
        let pairs: Vec<(String, String)> = entry
            .headers_json
            .as_deref()
            .and_then(|json| serde_json::from_str(json).ok())
            .unwrap_or_default();
        for (name, value) in pairs {
            if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(&value)) {
                headers.append(name, value);
            }
        }

        Ok(Self {
            final_url: url.clone(),
            url,
            status,
            content_type: entry.content_type,
            bytes: Bytes::from(entry.body),
            headers,
            fetch_ms: 0,
        })
    }
}

/// Network access used by the offline cache.
///
/// The manager only ever talks to the network through this trait, so tests
/// can script reachability and content.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Perform one request.
    ///
    /// # Errors
    ///
    /// Returns `Error::FetchFailed` when no response was received and
    /// `Error::FetchTooLarge` when the body exceeds the configured limit.
    async fn fetch(&self, request: &PageRequest) -> Result<FetchResponse, Error>;
}

/// HTTP fetch client backed by reqwest.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::FetchFailed(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }
}

#[async_trait::async_trait]
impl Fetcher for FetchClient {
    async fn fetch(&self, request: &PageRequest) -> Result<FetchResponse, Error> {
        let start = Instant::now();
        let url = request.url.clone();

        let mut builder = self.http.request(request.method.clone(), url.clone());
        if request.cache_mode == CacheMode::Reload {
            builder = builder
                .header(header::CACHE_CONTROL, "no-cache")
                .header(header::PRAGMA, "no-cache");
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::FetchFailed(format!("network error: {}", e)))?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                len, self.config.max_bytes
            )));
        }

        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::FetchFailed(format!("failed to read response: {}", e)))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                bytes.len(),
                self.config.max_bytes
            )));
        }

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} {} -> {} ({}) in {}ms ({} bytes)",
            request.method,
            url,
            final_url,
            status.as_u16(),
            fetch_ms,
            bytes.len()
        );

        Ok(FetchResponse { url, final_url, status, content_type, bytes, headers, fetch_ms })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;

    fn response(url: &str) -> FetchResponse {
        let url = Url::parse(url).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/css"));
        headers.insert(header::ETAG, HeaderValue::from_static("\"abc\""));
        FetchResponse {
            final_url: url.clone(),
            url,
            status: StatusCode::OK,
            content_type: Some("text/css".to_string()),
            bytes: Bytes::from_static(b"body { color: teal }"),
            headers,
            fetch_ms: 12,
        }
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "lobby-cache/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { user_agent: "lobby/test".into(), timeout_ms: 1500, ..Default::default() };
        let config = FetchConfig::from_app_config(&app);
        assert_eq!(config.user_agent, "lobby/test");
        assert_eq!(config.timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_entry_keyed_by_request_url() {
        let mut original = response("https://lobby.example/style.css?v=2");
        original.final_url = Url::parse("https://cdn.lobby.example/style.css").unwrap();
        let request = PageRequest::get(Url::parse("https://lobby.example/style.css?v=2#x").unwrap());

        let entry = original.to_entry(&request);
        assert_eq!(entry.method, "GET");
        assert_eq!(entry.url, "https://lobby.example/style.css?v=2");
        assert_eq!(entry.status_code, 200);
        assert_eq!(entry.body, b"body { color: teal }");
    }

    #[test]
    fn test_entry_restores_response() {
        let original = response("https://lobby.example/style.css");
        let request = PageRequest::get(original.url.clone());

        let restored = FetchResponse::from_entry(original.to_entry(&request)).unwrap();
        assert_eq!(restored.status, StatusCode::OK);
        assert_eq!(restored.bytes, original.bytes);
        assert_eq!(restored.content_type.as_deref(), Some("text/css"));
        assert_eq!(restored.headers.get(header::ETAG).unwrap(), "\"abc\"");
        assert_eq!(restored.fetch_ms, 0);
    }

    #[test]
    fn test_from_entry_rejects_bad_url() {
        let entry = CachedEntry::new("GET", "not a url", 200, Vec::new());
        assert!(matches!(FetchResponse::from_entry(entry), Err(Error::CorruptEntry(_))));
    }

    #[test]
    fn test_from_entry_tolerates_bad_headers() {
        let mut entry = CachedEntry::new("GET", "https://lobby.example/", 200, Vec::new());
        entry.headers_json = Some("{not json".into());
        let restored = FetchResponse::from_entry(entry).unwrap();
        assert!(restored.headers.is_empty());
    }

    #[test]
    fn test_entry_method_from_request() {
        let original = response("https://lobby.example/");
        let request = PageRequest::get(original.url.clone()).with_method(Method::HEAD);
        assert_eq!(original.to_entry(&request).method, "HEAD");
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let client = FetchClient::new(FetchConfig::default());
        assert!(client.is_ok());
    }
}
