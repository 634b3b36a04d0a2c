//! Shared fixtures for tool tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use lobby_client::fetch::cache_key_url;
use lobby_client::offline::RoutePolicy;
use lobby_client::{FetchResponse, Fetcher, OfflineCache, OfflineConfig, PageRequest};
use lobby_core::{CacheDb, Error};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{StatusCode, Url};
use rmcp::model::CallToolResult;
use serde::de::DeserializeOwned;

pub const SCOPE: &str = "https://lobby.example/";

/// Fixed site: every listed URL answers 200, anything else 404.
pub struct FixedSite {
    pages: HashMap<String, &'static str>,
    online: AtomicBool,
}

impl FixedSite {
    pub fn new(pages: &[(&str, &'static str)]) -> Arc<Self> {
        Arc::new(Self {
            pages: pages.iter().map(|(url, body)| (url.to_string(), *body)).collect(),
            online: AtomicBool::new(true),
        })
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl Fetcher for FixedSite {
    async fn fetch(&self, request: &PageRequest) -> Result<FetchResponse, Error> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(Error::FetchFailed("network unreachable".into()));
        }
        let (status, body) = match self.pages.get(&cache_key_url(&request.url)) {
            Some(body) => (StatusCode::OK, *body),
            None => (StatusCode::NOT_FOUND, "not found"),
        };
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        Ok(FetchResponse {
            url: request.url.clone(),
            final_url: request.url.clone(),
            status,
            content_type: Some("text/plain".into()),
            bytes: Bytes::from_static(body.as_bytes()),
            headers,
            fetch_ms: 1,
        })
    }
}

pub fn site() -> Arc<FixedSite> {
    FixedSite::new(&[
        ("https://lobby.example/", "<html>root</html>"),
        ("https://lobby.example/index.html", "<html>index</html>"),
        ("https://lobby.example/style.css", "body{}"),
    ])
}

/// A manager for generation `generation`, not yet installed.
pub async fn manager(db: CacheDb, site: &Arc<FixedSite>, generation: &str) -> Arc<OfflineCache> {
    let policy = RoutePolicy::new(
        Url::parse(SCOPE).unwrap(),
        &[r"/catalog/(manifest\.json|[^/?#]+\.csv)(\?|$)".to_string()],
        false,
    )
    .unwrap();
    let manifest = vec!["./".to_string(), "./index.html".to_string(), "./style.css".to_string()];
    let config = OfflineConfig::new(format!("lobby-cache-{generation}"), policy, manifest, "./").unwrap();
    Arc::new(OfflineCache::new(db, site.clone(), config))
}

/// An installed and activated manager over an in-memory store.
pub async fn active(site: &Arc<FixedSite>) -> Arc<OfflineCache> {
    let cache = manager(CacheDb::open_in_memory().await.unwrap(), site, "v1").await;
    cache.install().await.unwrap();
    cache.activate().await.unwrap();
    cache
}

/// Parse the JSON text content of a tool result.
pub fn output<T: DeserializeOwned>(result: &CallToolResult) -> T {
    let content_val = serde_json::to_value(&result.content[0]).unwrap();
    let text = content_val
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
