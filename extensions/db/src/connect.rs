//! Build the configured store.

use crate::error::StoreResult;
use crate::fallback::FallbackStore;
use crate::postgres::PgStore;
use crate::sqlite::SqliteStore;
use crate::store::{RecordStore, SharedStore};
use packtrack_core::config::AppConfig;
use std::sync::Arc;

/// Open the store described by `config`.
///
/// With a `database_url` the result is Postgres backed by the SQLite cache;
/// otherwise the SQLite store alone.
pub async fn open_store(config: &AppConfig) -> StoreResult<SharedStore> {
    let cache = SqliteStore::connect(&config.cache_url).await?;

    let store: SharedStore = match &config.database_url {
        Some(url) => {
            let primary = PgStore::connect_lazy(url)?;
            if let Err(err) = primary.ping().await {
                tracing::warn!(error = %err, "Primary store unreachable at startup, serving from cache");
            }
            tracing::info!(cache = %config.cache_url, "Using Postgres primary with SQLite cache");
            Arc::new(FallbackStore::new(primary, cache))
        }
        None => {
            tracing::info!(cache = %config.cache_url, "No database_url configured, using SQLite only");
            Arc::new(cache)
        }
    };
    Ok(store)
}
