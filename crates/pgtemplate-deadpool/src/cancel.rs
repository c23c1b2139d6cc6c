//! Cancellation support.
//!
//! Every blocking step (building a pool, the liveness check, statements
//! and queries) is awaited under the caller's [`CancellationToken`]. The
//! token is checked first, so an already-cancelled token never reaches the
//! network.
//!
//! ## Example
//!
//! ```rust,ignore
//! use pgtemplate_deadpool::CancellationToken;
//! use std::time::Duration;
//!
//! let ctx = CancellationToken::new();
//! let timeout = ctx.clone();
//! tokio::spawn(async move {
//!     tokio::time::sleep(Duration::from_secs(5)).await;
//!     timeout.cancel();
//! });
//!
//! // Fails with a cancellation error if it runs longer than 5 seconds
//! conn.exec(&ctx, "SELECT pg_sleep(60)", &[]).await?;
//! ```

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::DriverError;

/// Run `fut` until it completes or `ctx` is cancelled, whichever comes first.
///
/// Dropping the losing future releases whatever it had acquired so far.
pub(crate) async fn run<T, E, F>(ctx: &CancellationToken, fut: F) -> Result<T, DriverError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<DriverError>,
{
    tokio::select! {
        biased;
        () = ctx.cancelled() => Err(DriverError::Cancelled),
        res = fut => res.map_err(Into::into),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_completes_when_not_cancelled() {
        let ctx = CancellationToken::new();
        let res = run(&ctx, async { Ok::<_, DriverError>(7) }).await;
        assert!(matches!(res, Ok(7)));
    }

    #[tokio::test]
    async fn test_cancelled_token_wins_over_ready_future() {
        let ctx = CancellationToken::new();
        ctx.cancel();
        let res = run(&ctx, async { Ok::<_, DriverError>(7) }).await;
        assert!(matches!(res, Err(DriverError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_pending_future() {
        let ctx = CancellationToken::new();
        let trigger = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let res = run(&ctx, std::future::pending::<Result<(), DriverError>>()).await;
        assert!(matches!(res, Err(DriverError::Cancelled)));
    }

    #[tokio::test]
    async fn test_inner_error_is_converted() {
        let ctx = CancellationToken::new();
        let res = run(&ctx, async { "invalid".parse::<tokio_postgres::Config>().map(|_| ()) }).await;
        assert!(matches!(res, Err(DriverError::Postgres(_))));
    }
}
