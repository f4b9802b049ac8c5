//! Plugin context resolution
//!
//! [`ContextGetter`] is the pass-through used by callers; the
//! [`CachedContextProvider`] resolves datasources from configuration and
//! keeps resolved settings for a short TTL.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, instrument};

use contracts::{
    ContextProvider, ContextSettings, ContractError, DataSourceConfig, DataSourceSettings, OrgId,
    PluginContext, SignedInUser,
};

/// Resolves the plugin context for a datasource-bound channel
pub struct ContextGetter<P> {
    provider: Arc<P>,
}

impl<P> Clone for ContextGetter<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
        }
    }
}

impl<P: ContextProvider + Sync> ContextGetter<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    /// Get the context for `user` calling `plugin_id` on `datasource_uid`
    ///
    /// `Ok(None)` when the datasource is unknown in the user's org.
    pub async fn get_plugin_context(
        &self,
        user: &SignedInUser,
        plugin_id: &str,
        datasource_uid: &str,
        skip_cache: bool,
    ) -> Result<Option<PluginContext>, ContractError> {
        self.provider
            .get(plugin_id, datasource_uid, user, skip_cache)
            .await
    }
}

#[derive(Debug, Clone)]
struct StoredDataSource {
    plugin_id: String,
    settings: DataSourceSettings,
}

impl From<&DataSourceConfig> for StoredDataSource {
    fn from(config: &DataSourceConfig) -> Self {
        Self {
            plugin_id: config.plugin_id.clone(),
            settings: DataSourceSettings {
                uid: config.uid.clone(),
                name: config.name.clone(),
                url: config.url.clone(),
                json_data: config.json_data.clone().unwrap_or(serde_json::Value::Null),
            },
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    stored_at: Instant,
    datasource: StoredDataSource,
}

/// Context provider backed by configured datasources
#[derive(Debug)]
pub struct CachedContextProvider {
    /// org -> uid -> datasource
    datasources: HashMap<OrgId, HashMap<String, StoredDataSource>>,
    cache: Mutex<HashMap<(OrgId, String), CacheEntry>>,
    ttl: Duration,
    store_lookups: AtomicU64,
}

impl CachedContextProvider {
    pub fn new(datasources: &[DataSourceConfig], ttl: Duration) -> Self {
        let mut by_org: HashMap<OrgId, HashMap<String, StoredDataSource>> = HashMap::new();
        for ds in datasources {
            by_org
                .entry(ds.org_id)
                .or_default()
                .insert(ds.uid.clone(), StoredDataSource::from(ds));
        }

        Self {
            datasources: by_org,
            cache: Mutex::new(HashMap::new()),
            ttl,
            store_lookups: AtomicU64::new(0),
        }
    }

    pub fn from_settings(datasources: &[DataSourceConfig], settings: &ContextSettings) -> Self {
        Self::new(datasources, Duration::from_secs(settings.cache_ttl_secs))
    }

    /// Number of lookups that missed the cache
    pub fn store_lookups(&self) -> u64 {
        self.store_lookups.load(Ordering::Relaxed)
    }

    fn resolve(
        &self,
        org_id: OrgId,
        uid: &str,
        skip_cache: bool,
    ) -> Option<StoredDataSource> {
        let key = (org_id, uid.to_string());
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);

        if !skip_cache {
            if let Some(entry) = cache.get(&key) {
                if entry.stored_at.elapsed() < self.ttl {
                    return Some(entry.datasource.clone());
                }
            }
        }

        self.store_lookups.fetch_add(1, Ordering::Relaxed);
        let found = self
            .datasources
            .get(&org_id)
            .and_then(|by_uid| by_uid.get(uid))
            .cloned();

        match &found {
            Some(datasource) => {
                cache.insert(
                    key,
                    CacheEntry {
                        stored_at: Instant::now(),
                        datasource: datasource.clone(),
                    },
                );
            }
            None => {
                cache.remove(&key);
            }
        }
        found
    }
}

impl ContextProvider for CachedContextProvider {
    #[instrument(
        name = "context_get",
        skip(self, user),
        fields(org_id = user.org_id, user_id = user.user_id)
    )]
    async fn get(
        &self,
        plugin_id: &str,
        datasource_uid: &str,
        user: &SignedInUser,
        skip_cache: bool,
    ) -> Result<Option<PluginContext>, ContractError> {
        if datasource_uid.is_empty() {
            return Ok(Some(PluginContext {
                org_id: user.org_id,
                plugin_id: plugin_id.to_string(),
                user: user.clone(),
                datasource: None,
            }));
        }

        let Some(datasource) = self.resolve(user.org_id, datasource_uid, skip_cache) else {
            debug!("Datasource not found");
            return Ok(None);
        };

        if datasource.plugin_id != plugin_id {
            return Err(ContractError::PluginMismatch {
                plugin_id: plugin_id.to_string(),
                datasource_uid: datasource_uid.to_string(),
            });
        }

        Ok(Some(PluginContext {
            org_id: user.org_id,
            plugin_id: plugin_id.to_string(),
            user: user.clone(),
            datasource: Some(datasource.settings),
        }))
    }
}
