//! Pool and connection capabilities consumed by the transaction runner.
//!
//! The runner does not manage connections itself. It leases one from a [`Pool`],
//! drives it through [`Connection::execute`], and hands it back with
//! [`Pool::release`]. Implementations are provided for the sqlx pools of every
//! supported backend.

use sqlx::pool::PoolConnection;
use sqlx::{MySql, Postgres, Sqlite};
use std::future::Future;
use tracing::trace;

/// A leased database connection able to run raw SQL.
pub trait Connection: Send {
    /// Backend error. Carries whatever diagnostics the database reported
    /// (message, SQLSTATE, constraint name) and is passed through unmodified.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Execute a statement (or a batch of statements) and return the number of
    /// rows affected.
    fn execute(&mut self, sql: &str) -> impl Future<Output = Result<u64, Self::Error>> + Send;
}

/// A source of leased connections.
///
/// Implementations must be safe to share between concurrent invocations; each
/// invocation leases its own connection and capacity limits are the pool's
/// business.
pub trait Pool: Send + Sync {
    type Connection: Connection;

    /// Lease a connection.
    fn acquire(
        &self,
    ) -> impl Future<Output = Result<Self::Connection, <Self::Connection as Connection>::Error>> + Send;

    /// Return a leased connection. Takes the handle by value, so a handle can
    /// only ever be released once.
    fn release(&self, conn: Self::Connection);

    /// Dispose of a connection abandoned in an unknown state, e.g. with a
    /// transaction still open. It must never be handed out again.
    fn discard(&self, conn: Self::Connection);
}

/// Error type shared by a pool and its connections.
pub type ConnectionError<P> = <<P as Pool>::Connection as Connection>::Error;

/// Implements [`Connection`] and [`Pool`] for the sqlx types of each backend.
macro_rules! impl_sqlx_pool {
    ($($db:ty),+ $(,)?) => {
        $(
            impl Connection for PoolConnection<$db> {
                type Error = sqlx::Error;

                async fn execute(&mut self, sql: &str) -> Result<u64, sqlx::Error> {
                    let conn: &mut <$db as sqlx::Database>::Connection = &mut **self;
                    let result = sqlx::Executor::execute(conn, sqlx::raw_sql(sql)).await?;
                    Ok(result.rows_affected())
                }
            }

            impl Pool for sqlx::Pool<$db> {
                type Connection = PoolConnection<$db>;

                async fn acquire(&self) -> Result<PoolConnection<$db>, sqlx::Error> {
                    sqlx::Pool::<$db>::acquire(self).await
                }

                fn release(&self, conn: PoolConnection<$db>) {
                    trace!(idle = self.num_idle(), size = self.size(), "Returning connection to pool");
                    // Dropping a PoolConnection hands it back to its pool
                    drop(conn);
                }

                fn discard(&self, mut conn: PoolConnection<$db>) {
                    trace!(size = self.size(), "Closing abandoned connection");
                    // Closing ends the server session, which rolls back any open transaction
                    conn.close_on_drop();
                    drop(conn);
                }
            }
        )+
    };
}

impl_sqlx_pool!(Postgres, MySql, Sqlite);
