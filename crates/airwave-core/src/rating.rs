//! Songs, ratings and the validated submission that ties them together.
//!
//! A song is created lazily the first time anyone rates it and is never
//! updated afterwards. A rating is a single signed vote per `(song, user)`
//! pair; "not rated" is the absence of a row, never a zero value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Thumb ───────────────────────────────────────────────────────────────────

/// A signed vote. Serialised as the bare integer `1` or `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Thumb {
  Up,
  Down,
}

impl Thumb {
  pub fn value(self) -> i64 {
    match self {
      Self::Up => 1,
      Self::Down => -1,
    }
  }
}

impl TryFrom<i64> for Thumb {
  type Error = Error;

  fn try_from(v: i64) -> Result<Self> {
    match v {
      1 => Ok(Self::Up),
      -1 => Ok(Self::Down),
      other => Err(Error::InvalidRating(other)),
    }
  }
}

impl From<Thumb> for i64 {
  fn from(t: Thumb) -> Self { t.value() }
}

// ─── Songs ───────────────────────────────────────────────────────────────────

/// Internal surrogate key of a song row. Only used for joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SongId(pub i64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
  pub id:         SongId,
  pub song_hash:  String,
  pub title:      String,
  pub artist:     String,
  pub album:      Option<String>,
  pub created_at: DateTime<Utc>,
}

/// The fields needed to create a song on first rating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSong {
  pub song_hash: String,
  pub title:     String,
  pub artist:    String,
  pub album:     Option<String>,
}

impl NewSong {
  /// Validate and normalise the fields of a song.
  pub fn new(
    song_hash: impl Into<String>,
    title: impl Into<String>,
    artist: impl Into<String>,
    album: Option<String>,
  ) -> Result<Self> {
    Ok(Self {
      song_hash: required("songHash", song_hash.into())?,
      title:     required("title", title.into())?,
      artist:    required("artist", artist.into())?,
      album:     album.filter(|a| !a.trim().is_empty()),
    })
  }
}

/// Outcome of the insert half of insert-or-fetch.
///
/// `AlreadyExists` is the expected result of losing a first-rating race and
/// is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SongInsert {
  Inserted(SongId),
  AlreadyExists(SongId),
}

impl SongInsert {
  pub fn id(self) -> SongId {
    match self {
      Self::Inserted(id) | Self::AlreadyExists(id) => id,
    }
  }
}

// ─── Aggregate ───────────────────────────────────────────────────────────────

/// Up and down vote counts for one song.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregate {
  pub thumbs_up:   u64,
  pub thumbs_down: u64,
}

// ─── Submission ──────────────────────────────────────────────────────────────

/// A rating request that has passed validation.
///
/// Construction is the only validation point: every store operation that
/// writes takes a `Submission`, so malformed input never reaches storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
  pub song:    NewSong,
  pub user_id: String,
  pub thumb:   Thumb,
}

impl Submission {
  pub fn new(
    song_hash: impl Into<String>,
    user_id: impl Into<String>,
    rating: i64,
    title: impl Into<String>,
    artist: impl Into<String>,
    album: Option<String>,
  ) -> Result<Self> {
    let thumb = Thumb::try_from(rating)?;
    let user_id = required("userId", user_id.into())?;
    let song = NewSong::new(song_hash, title, artist, album)?;
    Ok(Self { song, user_id, thumb })
  }
}

fn required(field: &'static str, value: String) -> Result<String> {
  if value.trim().is_empty() {
    Err(Error::MissingField(field))
  } else {
    Ok(value)
  }
}
