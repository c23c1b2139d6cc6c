//! Pool registry.
//!
//! Maps database names to live pools. A pool is created lazily the first
//! time a name is requested and closed when it is released, either by the
//! connection bound to it or by a registry-wide shutdown.
//!
//! Creation uses double-checked locking: a shared-lock lookup first, then
//! the exclusive lock, a second lookup, and only then construction. The
//! exclusive lock is held while the pool is built, so concurrent first-time
//! requests for one name produce exactly one pool.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::RwLock;

/// A pool the registry can shut down.
pub(crate) trait ManagedPool: Send + Sync {
    /// Close the pool and drop its idle connections. Must be idempotent.
    fn close(&self);
}

impl ManagedPool for crate::manager::Pool {
    fn close(&self) {
        deadpool::managed::Pool::close(self);
    }
}

/// Name-to-pool map guarded by a single shared/exclusive lock.
pub(crate) struct PoolRegistry<P> {
    pools: RwLock<HashMap<String, Arc<P>>>,
}

impl<P: ManagedPool> PoolRegistry<P> {
    pub(crate) fn new() -> Self {
        Self {
            pools: RwLock::new(HashMap::new()),
        }
    }

    /// Look up the pool registered under `name`.
    pub(crate) async fn get(&self, name: &str) -> Option<Arc<P>> {
        self.pools.read().await.get(name).cloned()
    }

    /// Return the pool registered under `name`, building it with `create`
    /// if there is none.
    ///
    /// `create` runs at most once per call and only while the exclusive
    /// lock is held. If it fails, or the returned future is dropped before
    /// it finishes, nothing is registered.
    pub(crate) async fn get_or_create<F, Fut, E>(&self, name: &str, create: F) -> Result<Arc<P>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<P, E>>,
    {
        if let Some(pool) = self.get(name).await {
            tracing::trace!(database = name, "reusing registered pool");
            return Ok(pool);
        }

        let mut pools = self.pools.write().await;

        // Another caller may have registered the pool while we waited.
        if let Some(pool) = pools.get(name) {
            tracing::trace!(database = name, "pool registered concurrently");
            return Ok(Arc::clone(pool));
        }

        let pool = Arc::new(create().await?);
        pools.insert(name.to_owned(), Arc::clone(&pool));
        tracing::debug!(database = name, "registered connection pool");
        Ok(pool)
    }

    /// Close `pool` and remove it from the registry.
    ///
    /// Nothing happens unless the entry for `name` still refers to `pool`;
    /// a newer pool registered under the same name is left alone. Returns
    /// whether the pool was closed and removed.
    pub(crate) async fn release(&self, name: &str, pool: &Arc<P>) -> bool {
        let mut pools = self.pools.write().await;

        // Pools leave the map only through here or `close_all`, both of
        // which close them, so an absent entry means already closed.
        let registered = pools.get(name).is_some_and(|entry| Arc::ptr_eq(entry, pool));
        if registered {
            pool.close();
            pools.remove(name);
            tracing::debug!(database = name, "released connection pool");
        }
        registered
    }

    /// Close every registered pool and empty the registry.
    ///
    /// Returns the number of pools closed.
    pub(crate) async fn close_all(&self) -> usize {
        let mut pools = self.pools.write().await;
        let count = pools.len();
        for (name, pool) in pools.drain() {
            pool.close();
            tracing::trace!(database = %name, "closed connection pool");
        }
        count
    }

    /// Names of all currently registered pools, sorted.
    pub(crate) async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.pools.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}
