//! txn-runner
//!
//! Run a unit of work inside a database transaction: lease a pooled connection,
//! `BEGIN`, run the caller's logic, `COMMIT` on success, or `ROLLBACK` and
//! release on any failure, reporting the original error.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod script;

pub use config::Config;
pub use db::{Connection, DbConnection, DbPool, Pool, run_in_transaction};
pub use error::{DbError, DbResult};
pub use script::{Script, ScriptReport, execute_script};
