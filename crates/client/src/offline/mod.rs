//! Offline asset cache manager.
//!
//! Sits between the page and the network and decides, per request, whether
//! to answer from the durable cache store, from the network, or both.
//!
//! ### Lifecycle
//! - **Install**: precache every manifest locator concurrently into the
//!   store for the current generation. Individual failures are recorded and
//!   skipped; the phase always completes and takes over without waiting.
//! - **Activate**: delete every store whose name is not the current one,
//!   then control all requests.
//!
//! ### Routing
//! - Navigation: network-first, then exact entry, then root page.
//! - Catalog data: network-first, then exact entry (root page if enabled).
//! - Same-origin assets: cache-first with a tracked background refresh.
//! - Cross-origin and non-GET: pass-through, never stored.
//!
//! Store reads and writes are best effort: failures are logged and treated
//! as misses or skipped writes, never surfaced to the page.

pub mod lifecycle;
pub mod revalidate;
pub mod route;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use reqwest::Url;
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinSet;

pub use lifecycle::{ActivateReport, FailedLocator, InstallReport, WorkerState};
pub use revalidate::Revalidations;
pub use route::{RequestClass, RoutePolicy, Strategy, classify, route};

use crate::fetch::{CacheMode, FetchResponse, Fetcher, PageRequest, cache_key_url, resolve_locator};
use lobby_core::{AppConfig, CacheDb, Error};

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Live response.
    Network,
    /// Exact entry from the store.
    Cache,
    /// Root page served in place of the requested URL.
    Fallback,
    /// Fetched natively without consulting the store.
    PassThrough,
}

/// A response handed back to the page.
#[derive(Debug, Clone)]
pub struct ServedResponse {
    pub response: FetchResponse,
    pub source: Source,
    pub class: RequestClass,
}

impl ServedResponse {
    fn new(response: FetchResponse, source: Source, class: RequestClass) -> Self {
        Self { response, source, class }
    }
}

/// Static inputs of the manager.
#[derive(Debug, Clone)]
pub struct OfflineConfig {
    store_name: String,
    manifest: Vec<String>,
    fallback_url: Url,
    policy: RoutePolicy,
}

impl OfflineConfig {
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` if `fallback_path` does not resolve
    /// against the policy scope.
    pub fn new(
        store_name: impl Into<String>, policy: RoutePolicy, manifest: Vec<String>, fallback_path: &str,
    ) -> Result<Self, Error> {
        let fallback_url = resolve_locator(policy.scope(), fallback_path)
            .map_err(|e| Error::InvalidUrl(format!("fallback {fallback_path}: {e}")))?;
        Ok(Self { store_name: store_name.into(), manifest, fallback_url, policy })
    }

    /// Build from loaded application config.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` if the scope or fallback path does not
    /// parse, and `Error::InvalidInput` if a catalog pattern does not compile.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let scope = config.scope_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let policy = RoutePolicy::new(scope, &config.catalog_patterns, config.external_root_fallback)?;
        Self::new(config.store_name(), policy, config.manifest.clone(), &config.fallback_path)
    }

    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    pub fn manifest(&self) -> &[String] {
        &self.manifest
    }

    pub fn fallback_url(&self) -> &Url {
        &self.fallback_url
    }

    pub fn policy(&self) -> &RoutePolicy {
        &self.policy
    }
}

/// The offline cache manager.
///
/// Holds an explicit store handle and network handle; nothing is global.
pub struct OfflineCache {
    db: CacheDb,
    fetcher: Arc<dyn Fetcher>,
    config: OfflineConfig,
    state: RwLock<WorkerState>,
    revalidations: Revalidations,
}

impl OfflineCache {
    pub fn new(db: CacheDb, fetcher: Arc<dyn Fetcher>, config: OfflineConfig) -> Self {
        Self { db, fetcher, config, state: RwLock::new(WorkerState::Parsed), revalidations: Revalidations::new() }
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub fn config(&self) -> &OfflineConfig {
        &self.config
    }

    pub fn store_name(&self) -> &str {
        self.config.store_name()
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    async fn set_state(&self, state: WorkerState) {
        let mut current = self.state.write().await;
        if *current != state {
            tracing::info!(from = %*current, to = %state, store = %self.config.store_name, "lifecycle transition");
            *current = state;
        }
    }

    /// Precache the manifest into the current generation's store.
    ///
    /// Running install while already activated repopulates the store and
    /// keeps serving.
    ///
    /// # Errors
    ///
    /// Only fails when the store itself cannot be opened; the manager is
    /// then redundant. Locator failures are reported, not returned.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        let store = self.config.store_name.clone();
        let serving = self.state().await == WorkerState::Activated;
        if !serving {
            self.set_state(WorkerState::Installing).await;
        }

        if let Err(e) = self.db.open_store(&store).await {
            tracing::warn!(store = %store, error = %e, "failed to open cache store");
            if !serving {
                self.set_state(WorkerState::Redundant).await;
            }
            return Err(e);
        }

        let mut join_set = JoinSet::new();
        for (index, locator) in self.config.manifest.iter().enumerate() {
            let locator = locator.clone();
            let resolved = resolve_locator(self.config.policy.scope(), &locator);
            let fetcher = Arc::clone(&self.fetcher);
            let db = self.db.clone();
            let store = store.clone();

            join_set.spawn(async move {
                let outcome = match resolved {
                    Ok(url) => precache(fetcher.as_ref(), &db, &store, url).await,
                    Err(e) => Err(e.to_string()),
                };
                (index, locator, outcome)
            });
        }

        let mut outcomes = Vec::with_capacity(self.config.manifest.len());
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => tracing::warn!(error = %e, "precache task failed"),
            }
        }
        outcomes.sort_by_key(|(index, ..)| *index);

        let mut stored = Vec::new();
        let mut failed = Vec::new();
        for (_, locator, outcome) in outcomes {
            match outcome {
                Ok(url) => stored.push(url),
                Err(reason) => {
                    tracing::warn!(locator = %locator, reason = %reason, "skipping locator during install");
                    failed.push(FailedLocator { locator, reason });
                }
            }
        }

        if !serving {
            self.set_state(WorkerState::Installed).await;
        }
        tracing::info!(
            store = %store,
            stored = stored.len(),
            failed = failed.len(),
            "install complete, taking over without waiting"
        );

        Ok(InstallReport { store, stored, failed, skip_waiting: true })
    }

    /// Delete stale generations and start controlling requests.
    ///
    /// # Errors
    ///
    /// Returns `Error::Lifecycle` if install has not completed, or a store
    /// error if stale stores cannot be listed or deleted.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        let state = self.state().await;
        if !state.can_activate() {
            return Err(Error::Lifecycle(format!("cannot activate from state {state}")));
        }
        if state == WorkerState::Installed {
            self.set_state(WorkerState::Activating).await;
        }

        let current = self.config.store_name.clone();
        let mut deleted = Vec::new();
        for name in self.db.list_stores().await? {
            if name != current && self.db.delete_store(&name).await? {
                tracing::info!(store = %name, "deleted stale cache store");
                deleted.push(name);
            }
        }

        self.set_state(WorkerState::Activated).await;
        tracing::info!(store = %current, "claimed all clients");

        Ok(ActivateReport { store: current, deleted, claimed: true })
    }

    /// Route one request.
    ///
    /// Before activation requests are not controlled and pass through.
    ///
    /// # Errors
    ///
    /// Returns the network error when nothing in the fallback chain applies.
    pub async fn handle(&self, request: PageRequest) -> Result<ServedResponse, Error> {
        let (class, strategy) = route(&request, &self.config.policy);
        let controlled = self.state().await == WorkerState::Activated;
        let strategy = if controlled { strategy } else { Strategy::PassThrough };

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            mode = %request.mode,
            ?class,
            ?strategy,
            controlled,
            "routing request"
        );

        match strategy {
            Strategy::PassThrough => {
                let response = self.fetcher.fetch(&request).await?;
                Ok(ServedResponse::new(response, Source::PassThrough, class))
            }
            Strategy::NetworkFirst { store, root_fallback } => {
                self.network_first(request, class, store, root_fallback).await
            }
            Strategy::CacheFirst => self.cache_first(request, class).await,
        }
    }

    /// Wait for outstanding background refreshes.
    pub async fn wait_until_idle(&self) {
        self.revalidations.wait_idle().await;
    }

    /// Number of background refreshes still running.
    pub async fn pending_revalidations(&self) -> usize {
        self.revalidations.pending().await
    }

    async fn network_first(
        &self, request: PageRequest, class: RequestClass, store: bool, root_fallback: bool,
    ) -> Result<ServedResponse, Error> {
        match self.fetcher.fetch(&request).await {
            Ok(response) => {
                if store && response.status.is_success() {
                    store_response(&self.db, &self.config.store_name, &request, &response).await;
                }
                Ok(ServedResponse::new(response, Source::Network, class))
            }
            Err(err) => {
                tracing::debug!(url = %request.url, error = %err, "live fetch failed, trying cache");
                if let Some(cached) = self.lookup(&request.url).await {
                    return Ok(ServedResponse::new(cached, Source::Cache, class));
                }
                if root_fallback && let Some(root) = self.lookup(&self.config.fallback_url).await {
                    return Ok(ServedResponse::new(root, Source::Fallback, class));
                }
                Err(err)
            }
        }
    }

    async fn cache_first(&self, request: PageRequest, class: RequestClass) -> Result<ServedResponse, Error> {
        if let Some(cached) = self.lookup(&request.url).await {
            self.revalidate(request).await;
            return Ok(ServedResponse::new(cached, Source::Cache, class));
        }

        match self.fetcher.fetch(&request).await {
            Ok(response) => {
                if response.status.is_success() {
                    store_response(&self.db, &self.config.store_name, &request, &response).await;
                }
                Ok(ServedResponse::new(response, Source::Network, class))
            }
            Err(err) => {
                if let Some(root) = self.lookup(&self.config.fallback_url).await {
                    tracing::debug!(url = %request.url, error = %err, "asset unavailable, serving root page");
                    return Ok(ServedResponse::new(root, Source::Fallback, class));
                }
                Err(err)
            }
        }
    }

    /// Refresh a cached entry without holding up the response. A failed
    /// refresh leaves the existing entry in place.
    async fn revalidate(&self, request: PageRequest) {
        let fetcher = Arc::clone(&self.fetcher);
        let db = self.db.clone();
        let store = self.config.store_name.clone();

        self.revalidations
            .spawn(async move {
                match fetcher.fetch(&request).await {
                    Ok(response) if response.status.is_success() => {
                        store_response(&db, &store, &request, &response).await;
                        tracing::debug!(url = %request.url, "revalidated cached entry");
                    }
                    Ok(response) => {
                        tracing::debug!(
                            url = %request.url,
                            status = response.status.as_u16(),
                            "revalidation not successful, keeping cached entry"
                        );
                    }
                    Err(e) => {
                        tracing::debug!(url = %request.url, error = %e, "revalidation failed, keeping cached entry");
                    }
                }
            })
            .await;
    }

    async fn lookup(&self, url: &Url) -> Option<FetchResponse> {
        let key = cache_key_url(url);
        match self.db.match_entry(&self.config.store_name, "GET", &key).await {
            Ok(Some(entry)) => match FetchResponse::from_entry(entry) {
                Ok(response) => Some(response),
                Err(e) => {
                    tracing::warn!(url = %key, error = %e, "ignoring unreadable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(url = %key, error = %e, "cache lookup failed");
                None
            }
        }
    }
}

/// Fetch one locator with the HTTP cache bypassed and store it on 2xx.
async fn precache(fetcher: &dyn Fetcher, db: &CacheDb, store: &str, url: Url) -> Result<String, String> {
    let request = PageRequest::get(url).with_cache_mode(CacheMode::Reload);
    let response = fetcher.fetch(&request).await.map_err(|e| e.to_string())?;
    if !response.status.is_success() {
        return Err(format!("status {}", response.status.as_u16()));
    }
    db.put_entry(store, &response.to_entry(&request))
        .await
        .map_err(|e| e.to_string())?;
    Ok(cache_key_url(&request.url))
}

/// Best-effort write; a failed write only costs a future cache miss.
async fn store_response(db: &CacheDb, store: &str, request: &PageRequest, response: &FetchResponse) {
    if let Err(e) = db.put_entry(store, &response.to_entry(request)).await {
        tracing::warn!(url = %request.url, store = %store, error = %e, "failed to store response");
    }
}
