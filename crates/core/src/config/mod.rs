//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (LOBBY_CACHE_*)
//! 2. TOML config file (if LOBBY_CACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (LOBBY_CACHE_*)
/// 2. TOML config file (if LOBBY_CACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via LOBBY_CACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// URL of the page scope. Manifest locators resolve against it and its
    /// origin decides what counts as same-origin.
    ///
    /// Set via LOBBY_CACHE_SCOPE environment variable.
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Prefix of every cache store name.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Generation identifier. Bump on every release that changes a
    /// precached asset; otherwise old assets persist.
    ///
    /// Set via LOBBY_CACHE_GENERATION environment variable.
    #[serde(default = "default_generation")]
    pub generation: String,

    /// Relative locators precached at install time, in order.
    ///
    /// Set via LOBBY_CACHE_MANIFEST as a TOML array, e.g. `["./", "./index.html"]`.
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// Locator of the root page served when navigation has nothing better.
    #[serde(default = "default_fallback_path")]
    pub fallback_path: String,

    /// Regular expressions over absolute URLs marking freshness-sensitive
    /// external catalog data.
    #[serde(default = "default_catalog_patterns")]
    pub catalog_patterns: Vec<String>,

    /// Whether catalog data may fall back to the cached root page.
    #[serde(default)]
    pub external_root_fallback: bool,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via LOBBY_CACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via LOBBY_CACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via LOBBY_CACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./lobby-cache.sqlite")
}

fn default_scope() -> String {
    "http://localhost:8080/".into()
}

fn default_cache_prefix() -> String {
    "lobby-cache".into()
}

fn default_generation() -> String {
    "v1".into()
}

fn default_manifest() -> Vec<String> {
    [
        "./",
        "./index.html",
        "./style.css",
        "./app.js",
        "./manifest.webmanifest",
        "./icon-192.png",
        "./icon-512.png",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_fallback_path() -> String {
    "./".into()
}

fn default_catalog_patterns() -> Vec<String> {
    vec![r"/catalog/(manifest\.json|[^/?#]+\.csv)(\?|$)".into()]
}

fn default_user_agent() -> String {
    "lobby-cache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            scope: default_scope(),
            cache_prefix: default_cache_prefix(),
            generation: default_generation(),
            manifest: default_manifest(),
            fallback_path: default_fallback_path(),
            catalog_patterns: default_catalog_patterns(),
            external_root_fallback: false,
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Name of the cache store owned by the current generation.
    pub fn store_name(&self) -> String {
        format!("{}-{}", self.cache_prefix, self.generation)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let config_file = std::env::var("LOBBY_CACHE_CONFIG_FILE").ok();
        Self::from_figment(Self::figment(config_file.as_deref()))
    }

    fn figment(config_file: Option<&str>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = config_file {
            figment = figment.merge(Toml::file(path));
        }

        figment.merge(
            Env::prefixed("LOBBY_CACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        )
    }

    fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./lobby-cache.sqlite"));
        assert_eq!(config.scope, "http://localhost:8080/");
        assert_eq!(config.generation, "v1");
        assert_eq!(config.fallback_path, "./");
        assert_eq!(config.manifest.first().map(String::as_str), Some("./"));
        assert_eq!(config.catalog_patterns.len(), 1);
        assert!(!config.external_root_fallback);
        assert_eq!(config.user_agent, "lobby-cache/0.1");
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.max_bytes, 5_242_880);
    }

    #[test]
    fn test_store_name() {
        let config = AppConfig { generation: "v2".into(), ..Default::default() };
        assert_eq!(config.store_name(), "lobby-cache-v2");
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "lobby.toml",
                r#"
                generation = "v3"
                scope = "https://lobby.example/app/"
                manifest = ["./", "./style.css"]
                "#,
            )?;
            jail.set_env("LOBBY_CACHE_GENERATION", "v4");

            let config = AppConfig::from_figment(AppConfig::figment(Some("lobby.toml")))
                .map_err(|e| figment::Error::from(e.to_string()))?;
            assert_eq!(config.generation, "v4");
            assert_eq!(config.scope, "https://lobby.example/app/");
            assert_eq!(config.manifest, vec!["./".to_string(), "./style.css".to_string()]);
            Ok(())
        });
    }

    #[test]
    fn test_invalid_file_rejected() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("lobby.toml", r#"generation = """#)?;
            let result = AppConfig::from_figment(AppConfig::figment(Some("lobby.toml")));
            assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "generation"));
            Ok(())
        });
    }
}
