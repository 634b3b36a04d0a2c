//! Request classification.
//!
//! `route` is a pure function of the request and the policy; it never
//! touches the network or the store, so the whole decision table is tested
//! here in isolation.

use regex::Regex;
use reqwest::{Method, Url};
use serde::Serialize;

use crate::fetch::{PageRequest, RequestMode, is_same_origin};
use lobby_core::Error;

/// Inputs the classifier needs besides the request itself.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    scope: Url,
    catalog: Vec<Regex>,
    external_root_fallback: bool,
}

impl RoutePolicy {
    /// Build a policy, compiling the catalog patterns.
    pub fn new(scope: Url, catalog_patterns: &[String], external_root_fallback: bool) -> Result<Self, Error> {
        let catalog = catalog_patterns
            .iter()
            .map(|p| Regex::new(p).map_err(|e| Error::InvalidInput(format!("catalog pattern {p}: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { scope, catalog, external_root_fallback })
    }

    pub fn scope(&self) -> &Url {
        &self.scope
    }

    /// Whether a URL is freshness-sensitive catalog data.
    pub fn is_catalog(&self, url: &Url) -> bool {
        self.catalog.iter().any(|re| re.is_match(url.as_str()))
    }
}

/// What kind of request the page made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestClass {
    Navigation,
    ExternalData,
    StaticAsset,
    CrossOrigin,
    /// Anything other than GET.
    NotIntercepted,
}

/// How a request is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Live fetch first; fall back to the exact entry, then optionally the
    /// root page. `store` controls whether a 2xx live response is kept.
    NetworkFirst { store: bool, root_fallback: bool },
    /// Cached entry first with a background refresh; live fetch on miss.
    CacheFirst,
    /// Native fetch, never cached.
    PassThrough,
}

/// Classify a request.
pub fn classify(request: &PageRequest, policy: &RoutePolicy) -> RequestClass {
    if request.method != Method::GET {
        return RequestClass::NotIntercepted;
    }
    if request.mode == RequestMode::Navigate {
        return RequestClass::Navigation;
    }
    if policy.is_catalog(&request.url) {
        return RequestClass::ExternalData;
    }
    if is_same_origin(&request.url, policy.scope()) { RequestClass::StaticAsset } else { RequestClass::CrossOrigin }
}

impl RequestClass {
    /// The strategy applied to this class.
    pub fn strategy(self, request: &PageRequest, policy: &RoutePolicy) -> Strategy {
        match self {
            RequestClass::Navigation => Strategy::NetworkFirst {
                store: is_same_origin(&request.url, policy.scope()),
                root_fallback: true,
            },
            RequestClass::ExternalData => {
                Strategy::NetworkFirst { store: true, root_fallback: policy.external_root_fallback }
            }
            RequestClass::StaticAsset => Strategy::CacheFirst,
            RequestClass::CrossOrigin | RequestClass::NotIntercepted => Strategy::PassThrough,
        }
    }
}

/// Classify a request and pick its strategy.
pub fn route(request: &PageRequest, policy: &RoutePolicy) -> (RequestClass, Strategy) {
    let class = classify(request, policy);
    (class, class.strategy(request, policy))
}
