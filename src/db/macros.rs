//! Backend dispatch macro for the runtime-selected pool and connection enums.

/// Generate a match over the three backend variants of `DbPool` or
/// `DbConnection`, running the same body against each variant's inner value.
///
/// Each arm is type-checked separately, so the body may call methods whose
/// types differ per backend as long as the arms agree on the result type.
///
/// # Example
///
/// ```ignore
/// impl_db_dispatch!(DbPool, self, |pool| pool.close().await)
/// ```
macro_rules! impl_db_dispatch {
    ($enum:ident, $value:expr, |$inner:ident| $body:expr) => {
        match $value {
            $crate::db::backend::$enum::MySql($inner) => $body,
            $crate::db::backend::$enum::Postgres($inner) => $body,
            $crate::db::backend::$enum::SQLite($inner) => $body,
        }
    };
}

pub(crate) use impl_db_dispatch;
