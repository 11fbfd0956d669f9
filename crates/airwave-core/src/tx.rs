//! Backend-neutral rating transaction steps.
//!
//! A backend opens its own transaction, wraps it in a [`RatingTx`] and hands
//! it to [`ensure_song_in`] or [`submit_in`]. Committing or rolling back stays
//! with the backend. Keeping the step sequence here means the embedded and
//! client/server stores cannot drift apart in how they resolve the
//! insert-or-fetch race or upsert a vote.

use chrono::{DateTime, Utc};

use crate::{
  Error,
  rating::{Aggregate, NewSong, SongId, SongInsert, Submission, Thumb},
};

/// Primitive operations against one open transaction.
pub trait RatingTx {
  type Error: From<Error>;

  /// Insert `song` unless its hash already exists.
  ///
  /// Returns `None` on a `song_hash` conflict. Any other failure is an error.
  async fn insert_song(
    &mut self,
    song: &NewSong,
    created_at: DateTime<Utc>,
  ) -> Result<Option<SongId>, Self::Error>;

  async fn find_song_id(&mut self, song_hash: &str) -> Result<Option<SongId>, Self::Error>;

  /// Insert the `(song, user)` rating or overwrite its value in place.
  async fn upsert_rating(
    &mut self,
    song: SongId,
    user_id: &str,
    thumb: Thumb,
    created_at: DateTime<Utc>,
  ) -> Result<(), Self::Error>;

  async fn count_ratings(&mut self, song: SongId) -> Result<Aggregate, Self::Error>;
}

/// Insert-or-fetch for a song row.
pub async fn ensure_song_in<T: RatingTx>(
  tx: &mut T,
  song: &NewSong,
) -> Result<SongInsert, T::Error> {
  if let Some(id) = tx.find_song_id(&song.song_hash).await? {
    return Ok(SongInsert::AlreadyExists(id));
  }

  if let Some(id) = tx.insert_song(song, Utc::now()).await? {
    return Ok(SongInsert::Inserted(id));
  }

  // Another writer inserted the same hash between our lookup and insert.
  tracing::debug!(song_hash = %song.song_hash, "lost song insert race, re-reading");
  match tx.find_song_id(&song.song_hash).await? {
    Some(id) => Ok(SongInsert::AlreadyExists(id)),
    None => Err(Error::SongVanished(song.song_hash.clone()).into()),
  }
}

/// Ensure the song, upsert the vote, and count the song's votes.
pub async fn submit_in<T: RatingTx>(
  tx: &mut T,
  submission: &Submission,
) -> Result<Aggregate, T::Error> {
  let song_id = ensure_song_in(tx, &submission.song).await?.id();
  tx.upsert_rating(song_id, &submission.user_id, submission.thumb, Utc::now())
    .await?;
  tx.count_ratings(song_id).await
}
