//! Provider and connection error types.

use thiserror::Error;

/// Failure reported by the driver or the pool underneath a connection.
#[derive(Debug, Error)]
pub enum DriverError {
    /// PostgreSQL returned an error, or the connection failed.
    #[error(transparent)]
    Postgres(#[from] tokio_postgres::Error),

    /// The pool could not hand out a connection.
    #[error(transparent)]
    Pool(#[from] deadpool::managed::PoolError<tokio_postgres::Error>),

    /// The pool could not be built from its configuration.
    #[error(transparent)]
    Build(#[from] deadpool::managed::BuildError),

    /// The caller's cancellation token fired before the operation finished.
    #[error("operation cancelled")]
    Cancelled,
}

/// Errors returned by [`PgConnectionProvider`](crate::PgConnectionProvider)
/// and [`PgConnection`](crate::PgConnection).
///
/// Each provider failure names the stage of pool construction that failed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The connection string could not be parsed.
    #[error("failed to parse connection string: {0}")]
    ConnectionString(#[source] tokio_postgres::Error),

    /// A pool option is out of range. Reported before any network activity.
    #[error("{0}")]
    InvalidOption(String),

    /// The pool could not be built or its first connections could not be opened.
    #[error("failed to create connection pool: {0}")]
    PoolCreation(#[source] DriverError),

    /// The pool was built but did not answer the liveness check.
    #[error("failed to ping database: {0}")]
    Ping(#[source] DriverError),

    /// A statement or query failed.
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// A single-row query returned no rows.
    #[error("no rows in result set")]
    NoRows,
}

impl Error {
    /// Check if this is the "no rows" sentinel.
    #[must_use]
    pub fn is_no_rows(&self) -> bool {
        matches!(self, Self::NoRows)
    }

    /// Check if the operation was aborted by its cancellation token.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::PoolCreation(DriverError::Cancelled)
                | Self::Ping(DriverError::Cancelled)
                | Self::Driver(DriverError::Cancelled)
        )
    }
}

impl From<tokio_postgres::Error> for Error {
    fn from(e: tokio_postgres::Error) -> Self {
        Self::Driver(DriverError::Postgres(e))
    }
}

impl From<deadpool::managed::PoolError<tokio_postgres::Error>> for Error {
    fn from(e: deadpool::managed::PoolError<tokio_postgres::Error>) -> Self {
        Self::Driver(DriverError::Pool(e))
    }
}

/// Result type for provider and connection operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_messages() {
        let err = Error::PoolCreation(DriverError::Cancelled);
        assert_eq!(
            err.to_string(),
            "failed to create connection pool: operation cancelled"
        );

        let err = Error::Ping(DriverError::Cancelled);
        assert_eq!(err.to_string(), "failed to ping database: operation cancelled");

        let err = Error::InvalidOption("max_connections must be >= 1, got -1".into());
        assert_eq!(err.to_string(), "max_connections must be >= 1, got -1");
    }

    #[test]
    fn test_driver_errors_are_transparent() {
        let err = Error::Driver(DriverError::Cancelled);
        assert_eq!(err.to_string(), "operation cancelled");
    }

    #[test]
    fn test_no_rows_sentinel() {
        assert!(Error::NoRows.is_no_rows());
        assert!(!Error::Driver(DriverError::Cancelled).is_no_rows());
    }

    #[test]
    fn test_is_cancelled() {
        assert!(Error::PoolCreation(DriverError::Cancelled).is_cancelled());
        assert!(Error::Driver(DriverError::Cancelled).is_cancelled());
        assert!(!Error::NoRows.is_cancelled());
    }

    #[test]
    fn test_connection_string_error_message() {
        let parse_err = "invalid://connection/string"
            .parse::<tokio_postgres::Config>()
            .unwrap_err();
        let err = Error::ConnectionString(parse_err);
        assert!(err.to_string().starts_with("failed to parse connection string: "));
    }
}
