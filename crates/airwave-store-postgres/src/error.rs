//! Error type for `airwave-store-postgres`.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] airwave_core::Error),

  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),

  /// The transaction did not finish in time and was rolled back.
  #[error("transaction exceeded {0:?}")]
  Timeout(Duration),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
