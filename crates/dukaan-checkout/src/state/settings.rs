//! # Settings Cache
//!
//! Shop settings are read once per session and kept until something
//! changes them. Every write through the cache drops the cached copy;
//! writes made elsewhere need an explicit [`SettingsCache::invalidate`].

use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use dukaan_store::{Database, ShopSettings};

use crate::error::CheckoutResult;

#[derive(Debug, Clone)]
pub struct SettingsCache {
    db: Database,
    cached: Arc<RwLock<Option<Arc<ShopSettings>>>>,
}

impl SettingsCache {
    pub fn new(db: Database) -> Self {
        SettingsCache {
            db,
            cached: Arc::new(RwLock::new(None)),
        }
    }

    /// Cached settings, loading them on first use. `today` only matters
    /// when no financial year is configured.
    pub async fn get(&self, today: NaiveDate) -> CheckoutResult<Arc<ShopSettings>> {
        if let Some(settings) = self.cached.read().await.as_ref() {
            return Ok(settings.clone());
        }

        let mut slot = self.cached.write().await;
        if let Some(settings) = slot.as_ref() {
            return Ok(settings.clone());
        }
        debug!("Loading shop settings");
        let settings = Arc::new(self.db.settings().load(today).await?);
        *slot = Some(settings.clone());
        Ok(settings)
    }

    /// Drops the cached copy; the next `get` reloads.
    pub async fn invalidate(&self) {
        debug!("Shop settings invalidated");
        *self.cached.write().await = None;
    }

    /// Writes one setting and invalidates the cache.
    pub async fn set(&self, key: &str, value: &str, category: Option<&str>) -> CheckoutResult<()> {
        self.db.settings().set(key, value, category).await?;
        self.invalidate().await;
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.cached
            .try_read()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }
}
