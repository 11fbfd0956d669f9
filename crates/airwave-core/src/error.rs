//! Error types for `airwave-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A rating value other than `1` or `-1`.
  #[error("invalid rating {0}: must be 1 or -1")]
  InvalidRating(i64),

  /// A required string field was absent or blank.
  #[error("missing required field: {0}")]
  MissingField(&'static str),

  #[error("invalid argument: {0}")]
  InvalidArgument(String),

  /// The song-hash conflict fired on insert but the re-read found no row.
  #[error("song {0:?} conflicted on insert but could not be re-read")]
  SongVanished(String),
}

impl Error {
  /// `true` for errors caused by the caller's input rather than the store.
  pub fn is_validation(&self) -> bool {
    matches!(
      self,
      Self::InvalidRating(_) | Self::MissingField(_) | Self::InvalidArgument(_)
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
