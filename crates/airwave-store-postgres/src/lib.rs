//! PostgreSQL backend for the Airwave rating store.
//!
//! Unlike the embedded store there is no single writer: every submission
//! runs in its own `sqlx` transaction on a pooled connection, bounded by a
//! timeout so a stuck client cannot hold row locks indefinitely.

mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{PgOptions, PostgresStore};
