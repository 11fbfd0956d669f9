//! The `RatingStore` trait.
//!
//! The trait is implemented by storage backends (`airwave-store-sqlite`,
//! `airwave-store-postgres`). The API layer depends on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use crate::rating::{Aggregate, NewSong, Song, SongInsert, Submission, Thumb};

/// Abstraction over an Airwave rating backend.
///
/// Per `(song, user)` pair the store moves from *unrated* to *rated(±1)* and
/// then only flips between the two values; no operation removes a rating.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait RatingStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Return the id of the song keyed by `song.song_hash`, inserting it first
  /// if it does not exist yet. Concurrent first inserts converge on one row.
  fn ensure_song(
    &self,
    song: NewSong,
  ) -> impl Future<Output = Result<SongInsert, Self::Error>> + Send + '_;

  /// Atomically ensure the song, upsert this user's rating and return the
  /// song's fresh aggregate.
  ///
  /// On error nothing is persisted, not even the song row.
  fn submit_rating(
    &self,
    submission: Submission,
  ) -> impl Future<Output = Result<Aggregate, Self::Error>> + Send + '_;

  /// Vote counts for a song. An unknown song has zero votes.
  fn get_aggregate<'a>(
    &'a self,
    song_hash: &'a str,
  ) -> impl Future<Output = Result<Aggregate, Self::Error>> + Send + 'a;

  /// The user's current vote, or `None` if they never rated the song (or the
  /// song does not exist).
  fn get_user_rating<'a>(
    &'a self,
    song_hash: &'a str,
    user_id: &'a str,
  ) -> impl Future<Output = Result<Option<Thumb>, Self::Error>> + Send + 'a;

  /// Look up a song by its external hash.
  fn get_song<'a>(
    &'a self,
    song_hash: &'a str,
  ) -> impl Future<Output = Result<Option<Song>, Self::Error>> + Send + 'a;
}
