//! Shared application state for the kvstash server.
//!
//! Owns the store and the metrics registry; handlers receive a cheap clone via
//! axum's `State` extractor. Nothing here is process-global, so tests can build
//! as many independent instances as they like.

use std::sync::Arc;

use kvstash_core::GuardedMap;

use crate::config::ServerConfig;
use crate::obs::KvMetrics;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: ServerConfig,
    store: Arc<GuardedMap>,
    metrics: Arc<KvMetrics>,
}

impl AppState {
    /// Build state around a fresh, empty store.
    pub fn new(cfg: ServerConfig) -> Self {
        Self::with_store(cfg, Arc::new(GuardedMap::new()))
    }

    /// Build state around an existing store handle.
    pub fn with_store(cfg: ServerConfig, store: Arc<GuardedMap>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                cfg,
                store,
                metrics: Arc::new(KvMetrics::default()),
            }),
        }
    }

    pub fn cfg(&self) -> &ServerConfig {
        &self.inner.cfg
    }

    pub fn store(&self) -> &GuardedMap {
        &self.inner.store
    }

    pub fn store_handle(&self) -> Arc<GuardedMap> {
        Arc::clone(&self.inner.store)
    }

    pub fn metrics(&self) -> &KvMetrics {
        &self.inner.metrics
    }

    pub fn metrics_handle(&self) -> Arc<KvMetrics> {
        Arc::clone(&self.inner.metrics)
    }
}
