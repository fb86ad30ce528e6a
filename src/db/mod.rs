//! Database layer.
//!
//! This module provides:
//! - The pool and connection capabilities the runner consumes
//! - sqlx implementations of those capabilities for MySQL, PostgreSQL and SQLite
//! - A runtime-selected backend pool built from a connection URL
//! - The transaction runner itself

mod macros;

pub mod backend;
pub mod pool;
pub mod transaction;

pub use backend::{DbConnection, DbPool};
pub use pool::{Connection, ConnectionError, Pool};
pub use transaction::run_in_transaction;
