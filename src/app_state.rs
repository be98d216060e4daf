use std::sync::Arc;

use anyhow::Context;

use crate::balance_handler::BalanceHandler;
use crate::cache::lru_backend::LruBackend;
use crate::cache::memory_backend::MemoryBackend;
use crate::cache::CacheBackend;
use crate::config::{CacheType, Config, CACHE_MAX_ITEMS, CACHE_TTL};
use crate::metrics::{Metrics, METRICS_PREFIX};
use crate::upstream::{BalanceUpstream, RapidApiClient};

pub struct AppState {
    pub handler: BalanceHandler,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let metrics = Metrics::new(METRICS_PREFIX).context("fail to register metrics")?;

        let upstream = RapidApiClient::new(cfg.upstream_base_url()?, &cfg.api_key, &cfg.api_host)?;
        tracing::info!("Linked to upstream endpoint {}", upstream.endpoint());
        let cache = new_cache_backend(cfg.cache_type)?;

        Ok(Self::from_parts(Arc::new(upstream), cache, Arc::new(metrics)))
    }

    pub fn from_parts(
        upstream: Arc<dyn BalanceUpstream>,
        cache: Arc<dyn CacheBackend>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            handler: BalanceHandler::new(upstream, cache, metrics.clone()),
            metrics,
        }
    }
}

fn new_cache_backend(cache_type: CacheType) -> anyhow::Result<Arc<dyn CacheBackend>> {
    let backend: Arc<dyn CacheBackend> = match cache_type {
        CacheType::Lru => {
            tracing::info!("Using in LRU cache backend");
            Arc::new(LruBackend::new(CACHE_MAX_ITEMS, CACHE_TTL)?)
        }
        CacheType::Memory => {
            tracing::info!("Using in memory cache backend");
            Arc::new(MemoryBackend::new(CACHE_MAX_ITEMS, CACHE_TTL))
        }
    };

    Ok(backend)
}
