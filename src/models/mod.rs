//! Data models for the transaction runner.

pub mod connection;

pub use connection::{ConnectionConfig, ConnectionConfigError, DatabaseType};
