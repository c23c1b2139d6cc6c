//! Pool options.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Error;

/// Liveness check run against every freshly built pool.
pub const DEFAULT_HEALTH_CHECK_QUERY: &str = "SELECT 1";

/// Hook invoked after each new physical connection is established.
///
/// A failure discards the connection; the pool reports it to whoever was
/// waiting for that connection.
#[async_trait]
pub trait AfterConnect: Send + Sync {
    /// Prepare a freshly opened connection.
    async fn after_connect(&self, client: &tokio_postgres::Client)
    -> Result<(), tokio_postgres::Error>;
}

/// Options applied to every pool the provider creates.
///
/// Zero means "unset" for `max_connections` and "no limit" for the
/// duration fields. Setters may be chained; a later call overwrites an
/// earlier one on the same field.
///
/// ```rust
/// use std::time::Duration;
/// use pgtemplate_deadpool::PoolOptions;
///
/// let options = PoolOptions::new()
///     .max_connections(10)
///     .min_connections(2)
///     .max_connection_lifetime(Duration::from_secs(3600));
/// assert!(options.validate().is_ok());
/// ```
#[derive(Clone, Default)]
#[non_exhaustive]
pub struct PoolOptions {
    /// Maximum number of connections per pool (0 keeps the driver default).
    pub max_connections: i32,

    /// Number of connections opened up front when a pool is created.
    ///
    /// This is an initial warm-up, not a maintained floor: connections
    /// discarded later are not replaced until they are needed.
    pub min_connections: i32,

    /// Maximum age of a connection before it is discarded.
    pub max_connection_lifetime: Duration,

    /// Maximum time a connection may sit in the pool, measured from when it
    /// was last returned, before it is discarded. Time spent checked out
    /// does not count.
    pub max_connection_idle_time: Duration,

    /// Hook run on every new physical connection.
    pub after_connect: Option<Arc<dyn AfterConnect>>,

    /// Full pool configuration; the individual options above take
    /// precedence over it where they are set.
    pub pool_config: Option<deadpool::managed::PoolConfig>,
}

impl fmt::Debug for PoolOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolOptions")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("max_connection_lifetime", &self.max_connection_lifetime)
            .field("max_connection_idle_time", &self.max_connection_idle_time)
            .field("after_connect", &self.after_connect.is_some())
            .field("pool_config", &self.pool_config)
            .finish()
    }
}

impl PoolOptions {
    /// Create options with every field unset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole pool configuration.
    #[must_use]
    pub fn pool_config(mut self, config: deadpool::managed::PoolConfig) -> Self {
        self.pool_config = Some(config);
        self
    }

    /// Set the maximum number of connections in the pool.
    #[must_use]
    pub fn max_connections(mut self, count: i32) -> Self {
        self.max_connections = count;
        self
    }

    /// Set the number of connections opened when the pool is created.
    ///
    /// The pool is not topped back up to this count afterwards.
    #[must_use]
    pub fn min_connections(mut self, count: i32) -> Self {
        self.min_connections = count;
        self
    }

    /// Set the maximum time a connection may be reused.
    #[must_use]
    pub fn max_connection_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_connection_lifetime = lifetime;
        self
    }

    /// Set the maximum time a connection may sit unused in the pool.
    ///
    /// Idle time starts when the connection is returned, so a connection
    /// held by a long-running statement is not discarded for it.
    #[must_use]
    pub fn max_connection_idle_time(mut self, idle: Duration) -> Self {
        self.max_connection_idle_time = idle;
        self
    }

    /// Set a hook to run after each new connection is established.
    #[must_use]
    pub fn after_connect(mut self, hook: impl AfterConnect + 'static) -> Self {
        self.after_connect = Some(Arc::new(hook));
        self
    }

    /// Validate the options.
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_connections < 0 {
            return Err(Error::InvalidOption(format!(
                "max_connections must be >= 1, got {}",
                self.max_connections
            )));
        }
        if self.min_connections < 0 {
            return Err(Error::InvalidOption(format!(
                "min_connections must be >= 0, got {}",
                self.min_connections
            )));
        }
        if self.max_connections == 0
            && self.pool_config.as_ref().is_some_and(|c| c.max_size == 0)
        {
            return Err(Error::InvalidOption(
                "pool_config.max_size must be >= 1".into(),
            ));
        }
        if self.max_connections > 0 && self.min_connections > self.max_connections {
            return Err(Error::InvalidOption(
                "min_connections cannot be greater than max_connections".into(),
            ));
        }
        Ok(())
    }

    /// The pool size to request from deadpool, if one was set explicitly.
    pub(crate) fn max_size(&self) -> Option<usize> {
        usize::try_from(self.max_connections)
            .ok()
            .filter(|size| *size > 0)
    }

    /// Lifetime and idle limits, or `None` when both are unlimited.
    pub(crate) fn connection_limits(&self) -> Option<ConnectionLimits> {
        let limits = ConnectionLimits {
            max_lifetime: non_zero(self.max_connection_lifetime),
            max_idle_time: non_zero(self.max_connection_idle_time),
        };
        (limits.max_lifetime.is_some() || limits.max_idle_time.is_some()).then_some(limits)
    }
}

fn non_zero(d: Duration) -> Option<Duration> {
    (!d.is_zero()).then_some(d)
}

/// Limits checked before an idle connection is handed out again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ConnectionLimits {
    pub(crate) max_lifetime: Option<Duration>,
    pub(crate) max_idle_time: Option<Duration>,
}

impl ConnectionLimits {
    /// Name the limit a connection has exceeded, if any.
    pub(crate) fn exceeded(&self, age: Duration, idle: Duration) -> Option<&'static str> {
        if self.max_lifetime.is_some_and(|max| age > max) {
            return Some("connection exceeded its maximum lifetime");
        }
        if self.max_idle_time.is_some_and(|max| idle > max) {
            return Some("connection exceeded its maximum idle time");
        }
        None
    }
}
