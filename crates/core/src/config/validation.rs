//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;
use url::Url;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Parsed scope URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the scope is not an absolute
    /// http(s) URL with a host.
    pub fn scope_url(&self) -> Result<Url, ConfigError> {
        let scope = Url::parse(self.scope.trim()).map_err(|e| invalid("scope", e.to_string()))?;
        if !matches!(scope.scheme(), "http" | "https") {
            return Err(invalid("scope", format!("unsupported scheme: {}", scope.scheme())));
        }
        if scope.host_str().is_none() {
            return Err(invalid("scope", "must include a host"));
        }
        Ok(scope)
    }

    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_prefix` or `generation` is empty or contains whitespace
    /// - `scope` is not an absolute http(s) URL
    /// - a manifest locator or `fallback_path` resolves outside the scope's origin
    /// - a catalog pattern is not a valid regular expression
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [("cache_prefix", &self.cache_prefix), ("generation", &self.generation)] {
            if value.is_empty() {
                return Err(invalid(field, "must not be empty"));
            }
            if value.chars().any(char::is_whitespace) {
                return Err(invalid(field, "must not contain whitespace"));
            }
        }

        let scope = self.scope_url()?;

        if self.fallback_path.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "fallback_path".into(),
                hint: "Set LOBBY_CACHE_FALLBACK_PATH, usually \"./\"".into(),
            });
        }

        for locator in self.manifest.iter().chain(std::iter::once(&self.fallback_path)) {
            let resolved = scope
                .join(locator)
                .map_err(|e| invalid("manifest", format!("{locator}: {e}")))?;
            if resolved.origin() != scope.origin() {
                return Err(invalid("manifest", format!("{locator} resolves outside the scope origin")));
            }
        }

        for pattern in &self.catalog_patterns {
            regex::Regex::new(pattern).map_err(|e| invalid("catalog_patterns", e.to_string()))?;
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if !self.manifest.iter().any(|locator| locator == &self.fallback_path) {
            tracing::warn!(
                fallback_path = %self.fallback_path,
                "fallback_path is not precached; offline navigation has no root page until it is visited"
            );
        }

        Ok(())
    }
}
