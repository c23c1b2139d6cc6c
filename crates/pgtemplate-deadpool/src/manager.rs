//! Pool manager that enforces connection lifetime and idle limits.
//!
//! deadpool records when an object was last *checked out*. Idle time here
//! is measured from when a connection was last *returned*: every pooled
//! object carries a release timestamp, stamped when its [`Checkout`] guard
//! is dropped, and the limits are checked before the object is handed out
//! again.

use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};

use deadpool::managed::{Manager, Metrics, Object, RecycleError, RecycleResult};

use crate::config::ConnectionLimits;

/// The deadpool manager behind every pool this crate builds.
pub type PgManager = TrackingManager<deadpool_postgres::Manager>;

/// A client checked out of a [`Pool`].
pub type PooledClient = Checkout<deadpool_postgres::Manager>;

/// Connection pool for one database.
pub type Pool = deadpool::managed::Pool<PgManager, PooledClient>;

/// Wraps a deadpool manager, discarding connections that outlived their
/// limits instead of recycling them.
#[derive(Debug)]
pub struct TrackingManager<M> {
    inner: M,
    limits: Option<ConnectionLimits>,
}

impl<M> TrackingManager<M> {
    pub(crate) fn new(inner: M, limits: Option<ConnectionLimits>) -> Self {
        Self { inner, limits }
    }

    pub(crate) fn limits(&self) -> Option<ConnectionLimits> {
        self.limits
    }
}

/// A pooled connection and the instant it was last returned to the pool.
#[derive(Debug)]
pub struct Tracked<T> {
    conn: T,
    released: Instant,
}

impl<T> Tracked<T> {
    /// Time since the connection was last returned to the pool.
    #[must_use]
    pub fn idle(&self) -> Duration {
        self.released.elapsed()
    }
}

impl<T> Deref for Tracked<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.conn
    }
}

impl<T> DerefMut for Tracked<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.conn
    }
}

impl<M: Manager> Manager for TrackingManager<M> {
    type Type = Tracked<M::Type>;
    type Error = M::Error;

    async fn create(&self) -> Result<Self::Type, Self::Error> {
        let conn = self.inner.create().await?;
        Ok(Tracked {
            conn,
            released: Instant::now(),
        })
    }

    async fn recycle(&self, obj: &mut Self::Type, metrics: &Metrics) -> RecycleResult<Self::Error> {
        let exceeded = self
            .limits
            .and_then(|limits| limits.exceeded(metrics.age(), obj.idle()));
        if let Some(reason) = exceeded {
            tracing::trace!(reason, "discarding pooled connection");
            return Err(RecycleError::message(reason));
        }
        self.inner.recycle(&mut obj.conn, metrics).await
    }

    fn detach(&self, obj: &mut Self::Type) {
        self.inner.detach(&mut obj.conn);
    }
}

/// Checkout guard returned by [`Pool::get`](deadpool::managed::Pool::get).
///
/// Dereferences to the underlying client. Dropping it stamps the release
/// time and returns the connection to the pool.
pub struct Checkout<M: Manager>(Object<TrackingManager<M>>);

impl<M: Manager> From<Object<TrackingManager<M>>> for Checkout<M> {
    fn from(obj: Object<TrackingManager<M>>) -> Self {
        Self(obj)
    }
}

impl<M: Manager> Deref for Checkout<M> {
    type Target = M::Type;

    fn deref(&self) -> &M::Type {
        &self.0.conn
    }
}

impl<M: Manager> DerefMut for Checkout<M> {
    fn deref_mut(&mut self) -> &mut M::Type {
        &mut self.0.conn
    }
}

impl<M: Manager> Drop for Checkout<M> {
    fn drop(&mut self) {
        self.0.released = Instant::now();
    }
}
