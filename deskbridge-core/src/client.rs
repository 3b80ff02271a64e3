//! Cache-aware entry point for every operation

use crate::cache::{spawn_cleanup_task, CacheStats, Invalidator, ResponseCache};
use crate::catalog::{self, OperationKind};
use crate::error::{BridgeError, Result};
use crate::payload::{Params, Payload};
use crate::transport::RemoteFacade;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Routes operations through the cache or straight to the remote facade
///
/// Reads go through the cache at their catalog tier. Mutations always reach
/// the remote side and purge the reads they make stale before returning.
pub struct CachedClient {
    cache: Arc<ResponseCache>,
    remote: Arc<dyn RemoteFacade>,
    invalidator: Invalidator,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl CachedClient {
    pub fn new(cache: Arc<ResponseCache>, remote: Arc<dyn RemoteFacade>) -> Self {
        Self {
            invalidator: Invalidator::new(cache.clone()),
            cache,
            remote,
            sweeper: Mutex::new(None),
        }
    }

    /// Same as [`new`](Self::new), plus the background sweeper when the cache config asks for it
    pub fn with_cleanup(cache: Arc<ResponseCache>, remote: Arc<dyn RemoteFacade>) -> Self {
        let sweeper = spawn_cleanup_task(cache.clone());
        Self {
            invalidator: Invalidator::new(cache.clone()),
            cache,
            remote,
            sweeper: Mutex::new(sweeper),
        }
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Run an operation, serving reads from the cache when possible
    pub async fn call(&self, operation: &str, params: Params) -> Result<Payload> {
        self.dispatch(operation, params, false).await
    }

    /// Run an operation without consulting or filling the cache for reads
    ///
    /// Mutations behave exactly as with [`call`](Self::call).
    pub async fn call_fresh(&self, operation: &str, params: Params) -> Result<Payload> {
        self.dispatch(operation, params, true).await
    }

    async fn dispatch(&self, operation: &str, params: Params, bypass: bool) -> Result<Payload> {
        let spec = catalog::lookup(operation)
            .ok_or_else(|| BridgeError::UnknownOperation(operation.to_string()))?;

        match spec.kind {
            OperationKind::Read(tier) => {
                let key = self.cache.keys().build(operation, &params);
                let remote = self.remote.clone();
                self.cache
                    .get_or_fetch(&key, tier.duration(), bypass, || async move {
                        remote.invoke(operation, params).await
                    })
                    .await
            }
            OperationKind::Mutation(targets) => {
                // Keep a copy for resolving targets; the remote call consumes the original
                let invalidation_params = params.clone();
                let payload = self.remote.invoke(operation, params).await?;
                let removed = self
                    .invalidator
                    .apply(operation, targets, &invalidation_params)
                    .await?;
                debug!("{} done, {} cached entries dropped", operation, removed);
                Ok(payload)
            }
        }
    }

    /// Bypass the cache for every call until [`enable_cache`](Self::enable_cache)
    pub fn disable_cache(&self) {
        self.cache.disable();
    }

    pub fn enable_cache(&self) {
        self.cache.enable();
    }

    pub fn is_cache_enabled(&self) -> bool {
        self.cache.is_enabled()
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Drop every cached entry and reset the statistics
    pub async fn clear_cache(&self) -> usize {
        self.cache.clear().await
    }

    /// Stop background work and release the cache
    ///
    /// The remote session is owned by the caller and closed separately.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.sweeper.lock().await.take() {
            handle.abort();
        }
        let dropped = self.cache.clear().await;
        info!("Client shut down, {} cached entries dropped", dropped);
    }
}

impl Drop for CachedClient {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.get_mut().take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for CachedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedClient")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
