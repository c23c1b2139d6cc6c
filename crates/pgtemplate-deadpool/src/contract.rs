//! Contracts consumed by template-database managers.
//!
//! A template manager creates a template database, runs migrations in it,
//! and clones it for every test. It talks to PostgreSQL only through these
//! traits, so any pooling strategy can back it.
//!
//! # Native Async Traits
//!
//! The traits use `#[async_trait]` so the returned futures are `Send` and
//! managers can hold providers behind generics or in spawned tasks.

use async_trait::async_trait;
use tokio_postgres::types::{FromSqlOwned, ToSql};
use tokio_util::sync::CancellationToken;

/// Opens connections to named databases.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    /// Connection handle returned by [`connect`](Self::connect).
    type Connection: DatabaseConnection<Error = Self::Error>;

    /// Error type shared by the provider and its connections.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Open a connection to `database`.
    async fn connect(
        &self,
        ctx: &CancellationToken,
        database: &str,
    ) -> Result<Self::Connection, Self::Error>;

    /// The error value a single-row query reports when it matched no rows.
    fn no_rows_sentinel(&self) -> Self::Error;

    /// Release every resource the provider still holds.
    async fn close(&self);
}

/// A connection to one database.
#[async_trait]
pub trait DatabaseConnection: Send + Sync {
    /// Row returned by [`query_row`](Self::query_row).
    type Row: Row<Error = Self::Error>;

    /// Outcome of [`exec`](Self::exec).
    type ExecResult: Send;

    /// Error type for statements and queries.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Execute a statement that returns no rows.
    async fn exec(
        &self,
        ctx: &CancellationToken,
        statement: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Self::ExecResult, Self::Error>;

    /// Run a query expected to return at most one row.
    ///
    /// Errors are deferred until the row is scanned.
    async fn query_row(
        &self,
        ctx: &CancellationToken,
        query: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Self::Row;

    /// Release the connection. Calling this more than once is a no-op.
    async fn close(&self) -> Result<(), Self::Error>;
}

/// A single query result row, valid until it is scanned.
pub trait Row: Send {
    /// Error reported by [`scan`](Self::scan).
    type Error;

    /// Decode the row's columns into `T`, consuming the row.
    fn scan<T: ScanRow>(self) -> Result<T, Self::Error>;
}

/// Destination a row's columns can be scanned into.
///
/// Implemented for tuples of up to eight values; column `i` is decoded into
/// tuple element `i`.
///
/// ```rust,ignore
/// let (id, name): (i32, String) = conn
///     .query_row(&ctx, "SELECT id, name FROM users WHERE id = $1", &[&7])
///     .await
///     .scan()?;
/// ```
pub trait ScanRow: Sized {
    /// Decode `row` into `Self`.
    fn scan_row(row: &tokio_postgres::Row) -> Result<Self, tokio_postgres::Error>;
}

macro_rules! impl_scan_row {
    ($($idx:tt => $t:ident),+) => {
        impl<$($t),+> ScanRow for ($($t,)+)
        where
            $($t: FromSqlOwned,)+
        {
            fn scan_row(row: &tokio_postgres::Row) -> Result<Self, tokio_postgres::Error> {
                Ok(($(row.try_get::<usize, $t>($idx)?,)+))
            }
        }
    };
}

impl_scan_row!(0 => A);
impl_scan_row!(0 => A, 1 => B);
impl_scan_row!(0 => A, 1 => B, 2 => C);
impl_scan_row!(0 => A, 1 => B, 2 => C, 3 => D);
impl_scan_row!(0 => A, 1 => B, 2 => C, 3 => D, 4 => E);
impl_scan_row!(0 => A, 1 => B, 2 => C, 3 => D, 4 => E, 5 => F);
impl_scan_row!(0 => A, 1 => B, 2 => C, 3 => D, 4 => E, 5 => F, 6 => G);
impl_scan_row!(0 => A, 1 => B, 2 => C, 3 => D, 4 => E, 5 => F, 6 => G, 7 => H);
