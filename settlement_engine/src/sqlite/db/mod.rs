//! # SQLite Database methods
//!
//! This module contains "low-level" SQLite database interactions.
//!
//! All these interactions are simple functions (rather than stateful structs) that accept a `&mut SqliteConnection`
//! argument. Callers can obtain a connection from a pool, or open a transaction when several calls must be atomic, and
//! pass `&mut tx` without any other changes.
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod actors;
pub mod catalog;
pub mod orders;
pub mod slots;
pub mod withdrawals;

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}

/// Maps a column that holds text we wrote ourselves (an enum, a JSON blob) to a decode error when it fails to parse.
pub(crate) fn decode_err<E>(column: &str, e: E) -> SqlxError
where E: std::error::Error + Send + Sync + 'static {
    SqlxError::ColumnDecode { index: column.to_string(), source: Box::new(e) }
}
