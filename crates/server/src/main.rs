//! lobby-cache server entry point.
//!
//! Boots the offline cache manager (install then activate) and serves it to
//! a host over MCP on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use lobby_client::{FetchClient, FetchConfig, OfflineCache, OfflineConfig};
use lobby_core::{AppConfig, CacheDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    tracing::info!(
        store = %config.store_name(),
        scope = %config.scope,
        db_path = %config.db_path.display(),
        "Starting lobby-cache server on stdio transport"
    );

    let db = open_db(&config).await?;
    let fetcher = FetchClient::new(FetchConfig::from_app_config(&config))?;
    let offline = OfflineConfig::from_app_config(&config)?;
    let cache = Arc::new(OfflineCache::new(db, Arc::new(fetcher), offline));

    let report = cache.install().await?;
    if !report.failed.is_empty() {
        tracing::warn!(
            failed = report.failed.len(),
            manifest = cache.config().manifest().len(),
            "some manifest locators were not precached"
        );
    }
    cache.activate().await?;

    let handler = handler::LobbyCacheServer::new(Arc::clone(&cache));
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    cache.wait_until_idle().await;
    tracing::info!("lobby-cache server stopped");

    Ok(())
}

async fn open_db(config: &AppConfig) -> Result<CacheDb> {
    CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("failed to open cache database at {}", config.db_path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_open_db_in_memory() {
        let config = AppConfig { db_path: PathBuf::from(":memory:"), ..Default::default() };
        let db = open_db(&config).await.unwrap();
        db.open_store(&config.store_name()).await.unwrap();
        assert_eq!(db.list_stores().await.unwrap(), vec![config.store_name()]);
    }

    #[tokio::test]
    async fn test_open_db_error_names_path() {
        let config = AppConfig { db_path: PathBuf::from("/nonexistent-dir/lobby/cache.sqlite"), ..Default::default() };
        let err = open_db(&config).await.unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent-dir/lobby/cache.sqlite"));
    }
}
