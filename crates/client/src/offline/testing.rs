//! Scripted network for manager tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;

use crate::fetch::{CacheMode, FetchResponse, Fetcher, PageRequest, cache_key_url};
use lobby_core::Error;

#[derive(Clone)]
enum Scripted {
    Respond(u16, Bytes),
    Unreachable,
}

/// In-process network. Unscripted URLs answer 404.
pub(crate) struct ScriptedFetcher {
    online: AtomicBool,
    delay: Mutex<Option<Duration>>,
    routes: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<(String, CacheMode)>>,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            online: AtomicBool::new(true),
            delay: Mutex::new(None),
            routes: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn serve(&self, url: &str, status: u16, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Scripted::Respond(status, Bytes::from(body.to_string())));
    }

    /// Make one URL fail at the transport level.
    pub(crate) fn unreachable(&self, url: &str) {
        self.routes.lock().unwrap().insert(url.to_string(), Scripted::Unreachable);
    }

    pub(crate) fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub(crate) fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    pub(crate) fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|(u, _)| u == url).count()
    }

    pub(crate) fn cache_modes(&self) -> Vec<CacheMode> {
        self.calls.lock().unwrap().iter().map(|(_, mode)| *mode).collect()
    }
}

#[async_trait::async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &PageRequest) -> Result<FetchResponse, Error> {
        let url = cache_key_url(&request.url);
        self.calls.lock().unwrap().push((url.clone(), request.cache_mode));

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if !self.online.load(Ordering::SeqCst) {
            return Err(Error::FetchFailed("network unreachable".into()));
        }

        let scripted = self.routes.lock().unwrap().get(&url).cloned();
        let (status, bytes) = match scripted {
            Some(Scripted::Respond(status, bytes)) => (status, bytes),
            Some(Scripted::Unreachable) => return Err(Error::FetchFailed(format!("{url}: connection reset"))),
            None => (404, Bytes::from_static(b"not found")),
        };

        Ok(FetchResponse {
            url: request.url.clone(),
            final_url: request.url.clone(),
            status: StatusCode::from_u16(status).unwrap(),
            content_type: None,
            bytes,
            headers: HeaderMap::new(),
            fetch_ms: 1,
        })
    }
}
