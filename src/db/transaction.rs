//! Run a unit of work inside a database transaction.
//!
//! [`run_in_transaction`] leases a connection, issues `BEGIN`, hands the
//! connection to the caller's work function and issues `COMMIT` when the work
//! succeeds. Whatever step fails, the same cleanup runs exactly once:
//!
//! - no connection was obtained: the error is returned, nothing else happens;
//! - a connection was obtained: `ROLLBACK` is issued, the connection is released
//!   and the original error is returned. A failing `ROLLBACK` is logged and
//!   otherwise ignored;
//! - everything succeeded: the connection is released and the work function's
//!   value is returned.
//!
//! No timeout is applied. Callers that need bounded latency must wrap the call
//! themselves, e.g. with `tokio::time::timeout`. If the returned future is
//! dropped while a connection is leased, no `ROLLBACK` can be awaited; the
//! connection is handed to [`Pool::discard`] instead of [`Pool::release`], so a
//! half-finished transaction never goes back into the pool.

use crate::db::pool::{Connection, ConnectionError, Pool};
use futures_util::future::BoxFuture;
use tracing::{Instrument, debug, debug_span, warn};

pub const BEGIN: &str = "BEGIN";
pub const COMMIT: &str = "COMMIT";
pub const ROLLBACK: &str = "ROLLBACK";

/// Run `work` inside a transaction on a connection leased from `pool`.
///
/// Errors from the pool and from `BEGIN`/`COMMIT` are converted into `E` with
/// `From`; errors produced by `work` are returned as they are. The success
/// value is only returned once `COMMIT` has succeeded.
///
/// The work function receives the connection for the duration of the
/// transaction and must not keep it. Move owned data into the returned future:
///
/// ```ignore
/// let count: i64 = run_in_transaction(&pool, |conn| {
///     Box::pin(async move {
///         sqlx::query("INSERT INTO usr(email) VALUES('me@example.com')")
///             .execute(&mut **conn)
///             .await?;
///         sqlx::query_scalar("SELECT count(*) FROM usr")
///             .fetch_one(&mut **conn)
///             .await
///     })
/// })
/// .await?;
/// ```
pub async fn run_in_transaction<P, F, T, E>(pool: &P, work: F) -> Result<T, E>
where
    P: Pool,
    E: From<ConnectionError<P>>,
    F: for<'c> FnOnce(&'c mut P::Connection) -> BoxFuture<'c, Result<T, E>>,
{
    let span = debug_span!("transaction", id = %generate_transaction_id());

    async move {
        let conn = match pool.acquire().await {
            Ok(conn) => conn,
            Err(err) => {
                debug!(error = %err, "Failed to acquire connection, nothing to release");
                return Err(E::from(err));
            }
        };
        debug!("Acquired connection");

        let mut lease = Lease::new(pool, conn);
        let outcome = run_steps(lease.conn(), work).await;
        lease.finish(outcome).await
    }
    .instrument(span)
    .await
}

/// BEGIN, work, COMMIT. Stops at the first failure.
async fn run_steps<C, F, T, E>(conn: &mut C, work: F) -> Result<T, E>
where
    C: Connection,
    E: From<C::Error>,
    F: for<'c> FnOnce(&'c mut C) -> BoxFuture<'c, Result<T, E>>,
{
    debug!("Beginning transaction");
    conn.execute(BEGIN).await?;

    debug!("Running work function");
    let value = work(&mut *conn).await?;

    debug!("Committing transaction");
    conn.execute(COMMIT).await?;

    Ok(value)
}

/// A connection on loan from a pool for the length of one invocation.
///
/// Either [`Lease::finish`] releases it, or dropping the lease discards it.
struct Lease<'p, P: Pool> {
    pool: &'p P,
    conn: Option<P::Connection>,
}

impl<'p, P: Pool> Lease<'p, P> {
    fn new(pool: &'p P, conn: P::Connection) -> Self {
        Self {
            pool,
            conn: Some(conn),
        }
    }

    fn conn(&mut self) -> &mut P::Connection {
        // Only finish() and drop() take the connection, and both end the lease
        self.conn
            .as_mut()
            .expect("lease holds its connection until finished")
    }

    /// Roll back if the steps failed, then release the connection.
    async fn finish<T, E>(mut self, outcome: Result<T, E>) -> Result<T, E> {
        let result = match outcome {
            Ok(value) => {
                debug!("Transaction committed, releasing connection");
                Ok(value)
            }
            Err(err) => {
                debug!("Transaction failed, rolling back");
                match self.conn().execute(ROLLBACK).await {
                    Ok(_) => debug!("Rollback completed"),
                    Err(rollback_err) => warn!(
                        error = %rollback_err,
                        "Rollback failed, reporting the original error"
                    ),
                }
                Err(err)
            }
        };
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
        result
    }
}

impl<P: Pool> Drop for Lease<'_, P> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            warn!("Transaction abandoned before completion, discarding connection");
            self.pool.discard(conn);
        }
    }
}

/// Generate a unique id for the transaction's log span.
fn generate_transaction_id() -> String {
    format!("tx_{}", uuid::Uuid::new_v4().simple())
}
