//! Pool-backed database connections.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{TryStreamExt, pin_mut};
use tokio_postgres::SimpleQueryMessage;
use tokio_postgres::types::ToSql;
use tokio_util::sync::CancellationToken;

use crate::cancel;
use crate::contract::{DatabaseConnection, Row, ScanRow};
use crate::error::{DriverError, Error, Result};
use crate::manager::Pool;
use crate::registry::PoolRegistry;

/// Outcome of [`PgConnection::exec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecResult {
    rows_affected: u64,
}

impl ExecResult {
    /// Rows affected by the statement, as reported by the server for the
    /// last command that ran.
    #[must_use]
    pub fn rows_affected(&self) -> u64 {
        self.rows_affected
    }
}

/// Back-reference to the registry a pool was created by.
struct Registration {
    registry: Arc<PoolRegistry<Pool>>,
    database: String,
}

/// A handle to the pool for one database.
///
/// Handles for the same database share one pool. Closing any of them closes
/// that pool and removes it from the provider, so the next
/// [`connect`](crate::PgConnectionProvider::connect) builds a fresh one.
pub struct PgConnection {
    pool: Arc<Pool>,
    registration: Option<Registration>,
}

impl PgConnection {
    /// Wrap a pool that is not tracked by any provider, typically one from
    /// [`build_pool`](crate::build_pool).
    ///
    /// Closing the connection closes the pool directly.
    #[must_use]
    pub fn from_pool(pool: Pool) -> Self {
        Self {
            pool: Arc::new(pool),
            registration: None,
        }
    }

    pub(crate) fn registered(
        pool: Arc<Pool>,
        registry: Arc<PoolRegistry<Pool>>,
        database: &str,
    ) -> Self {
        Self {
            pool,
            registration: Some(Registration {
                registry,
                database: database.to_owned(),
            }),
        }
    }

    /// The underlying pool.
    #[must_use]
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Name of the database this connection was opened for, if it was
    /// opened through a provider.
    #[must_use]
    pub fn database(&self) -> Option<&str> {
        self.registration.as_ref().map(|r| r.database.as_str())
    }

    /// Execute a statement.
    ///
    /// Without parameters the statement goes through the simple query
    /// protocol, so a script of several `;`-separated statements runs as
    /// one batch. With parameters it is prepared and executed.
    pub async fn exec(
        &self,
        ctx: &CancellationToken,
        statement: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<ExecResult> {
        let rows_affected = cancel::run(ctx, execute(&self.pool, statement, params)).await?;
        Ok(ExecResult { rows_affected })
    }

    /// Run a query and keep its first row.
    ///
    /// Any failure is reported when the returned row is scanned.
    pub async fn query_row(
        &self,
        ctx: &CancellationToken,
        query: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> PgRow {
        let row = cancel::run(ctx, query_first(&self.pool, query, params)).await;
        PgRow {
            row: row.map_err(Error::Driver),
        }
    }

    /// Close the pool behind this connection.
    ///
    /// For a provider-tracked connection the pool is also removed from the
    /// provider. Safe to call repeatedly and concurrently with
    /// [`PgConnectionProvider::close`](crate::PgConnectionProvider::close).
    pub async fn close(&self) -> Result<()> {
        match &self.registration {
            None => self.pool.close(),
            Some(reg) => {
                reg.registry.release(&reg.database, &self.pool).await;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for PgConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgConnection")
            .field("database", &self.database())
            .field("closed", &self.pool.is_closed())
            .field("status", &self.pool.status())
            .finish()
    }
}

async fn execute(
    pool: &Pool,
    statement: &str,
    params: &[&(dyn ToSql + Sync)],
) -> std::result::Result<u64, DriverError> {
    let client = pool.get().await?;
    if !params.is_empty() {
        return Ok(client.execute(statement, params).await?);
    }

    let messages = client.simple_query(statement).await?;
    Ok(messages
        .iter()
        .rev()
        .find_map(|msg| match msg {
            SimpleQueryMessage::CommandComplete(rows) => Some(*rows),
            _ => None,
        })
        .unwrap_or(0))
}

async fn query_first(
    pool: &Pool,
    query: &str,
    params: &[&(dyn ToSql + Sync)],
) -> std::result::Result<Option<tokio_postgres::Row>, DriverError> {
    let client = pool.get().await?;
    let rows = client.query_raw(query, params.iter().copied()).await?;
    pin_mut!(rows);
    Ok(rows.try_next().await?)
}

/// First row of a [`PgConnection::query_row`] result.
#[derive(Debug)]
pub struct PgRow {
    row: Result<Option<tokio_postgres::Row>>,
}

impl PgRow {
    /// Decode the row into a tuple, consuming it.
    ///
    /// Returns [`Error::NoRows`] if the query matched nothing, or the
    /// query's own error if it failed.
    pub fn scan<T: ScanRow>(self) -> Result<T> {
        match self.row? {
            Some(row) => T::scan_row(&row).map_err(Error::from),
            None => Err(Error::NoRows),
        }
    }
}

impl Row for PgRow {
    type Error = Error;

    fn scan<T: ScanRow>(self) -> Result<T> {
        PgRow::scan(self)
    }
}

#[async_trait]
impl DatabaseConnection for PgConnection {
    type Row = PgRow;
    type ExecResult = ExecResult;
    type Error = Error;

    async fn exec(
        &self,
        ctx: &CancellationToken,
        statement: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<ExecResult> {
        PgConnection::exec(self, ctx, statement, params).await
    }

    async fn query_row(
        &self,
        ctx: &CancellationToken,
        query: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> PgRow {
        PgConnection::query_row(self, ctx, query, params).await
    }

    async fn close(&self) -> Result<()> {
        PgConnection::close(self).await
    }
}
