//! Encoding and decoding helpers between domain types and SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings; ratings as the integers 1/-1.

use airwave_core::rating::{Song, SongId, Thumb};
use chrono::{DateTime, Utc};

use crate::{Error, Result};

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_thumb(v: i64) -> Result<Thumb> { Ok(Thumb::try_from(v)?) }

/// Non-negative row count from a `COUNT(*)` column.
pub fn decode_count(n: i64) -> u64 { u64::try_from(n).unwrap_or_default() }

/// A `songs` row exactly as read from SQLite.
pub struct RawSong {
  pub id:         i64,
  pub song_hash:  String,
  pub title:      String,
  pub artist:     String,
  pub album:      Option<String>,
  pub created_at: String,
}

impl RawSong {
  pub fn into_song(self) -> Result<Song> {
    Ok(Song {
      id:         SongId(self.id),
      song_hash:  self.song_hash,
      title:      self.title,
      artist:     self.artist,
      album:      self.album,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}
