//! [`SqliteStore`]: the SQLite implementation of [`RatingStore`].

use std::{path::Path, time::Duration};

use airwave_core::{
  rating::{Aggregate, NewSong, Song, SongId, SongInsert, Submission, Thumb},
  schema::{self, Dialect},
  store::RatingStore,
  tx::{RatingTx, ensure_song_in, submit_in},
};
use chrono::{DateTime, Utc};
use futures::executor::block_on;
use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior};

use crate::{
  Error, Result,
  encode::{RawSong, decode_count, decode_thumb, encode_dt},
};

/// How long a writer waits for another connection's lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A rating store backed by a single SQLite file.
///
/// Cloning is cheap. The inner connection is reference-counted and every
/// clone shares the same writer thread.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(PRAGMAS)?;
        for stmt in schema::statements(Dialect::Sqlite) {
          conn.execute(&stmt, [])?;
        }
        conn.pragma_update(None, "user_version", 1)?;
        Ok(())
      })
      .await?;
    tracing::debug!("sqlite schema ready");
    Ok(())
  }

  /// Run `f` inside a `BEGIN IMMEDIATE` transaction on the writer thread.
  ///
  /// The transaction commits only when `f` succeeds; otherwise it is dropped
  /// and rolled back.
  async fn write<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&mut SqliteTx<'_>) -> Result<T> + Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let result = f(&mut SqliteTx { conn: &tx });
        if result.is_ok() {
          tx.commit()?;
        }
        Ok(result)
      })
      .await?
  }
}

// ─── Transaction steps ───────────────────────────────────────────────────────

/// [`RatingTx`] over an open rusqlite transaction.
///
/// Every method completes synchronously, so the shared step futures never
/// pend and can be driven with `block_on` on the writer thread.
struct SqliteTx<'a> {
  conn: &'a Connection,
}

impl RatingTx for SqliteTx<'_> {
  type Error = Error;

  async fn insert_song(
    &mut self,
    song: &NewSong,
    created_at: DateTime<Utc>,
  ) -> Result<Option<SongId>> {
    let inserted = self.conn.execute(
      "INSERT INTO songs (title, artist, album, song_hash, created_at)
       VALUES (?1, ?2, ?3, ?4, ?5)
       ON CONFLICT (song_hash) DO NOTHING",
      rusqlite::params![
        song.title,
        song.artist,
        song.album,
        song.song_hash,
        encode_dt(created_at),
      ],
    )?;
    Ok((inserted == 1).then(|| SongId(self.conn.last_insert_rowid())))
  }

  async fn find_song_id(&mut self, song_hash: &str) -> Result<Option<SongId>> {
    Ok(
      self
        .conn
        .query_row(
          "SELECT id FROM songs WHERE song_hash = ?1",
          rusqlite::params![song_hash],
          |row| row.get(0).map(SongId),
        )
        .optional()?,
    )
  }

  async fn upsert_rating(
    &mut self,
    song: SongId,
    user_id: &str,
    thumb: Thumb,
    created_at: DateTime<Utc>,
  ) -> Result<()> {
    self.conn.execute(
      "INSERT INTO ratings (song_id, user_id, rating, created_at)
       VALUES (?1, ?2, ?3, ?4)
       ON CONFLICT (song_id, user_id) DO UPDATE SET rating = excluded.rating",
      rusqlite::params![song.0, user_id, thumb.value(), encode_dt(created_at)],
    )?;
    Ok(())
  }

  async fn count_ratings(&mut self, song: SongId) -> Result<Aggregate> {
    let (up, down): (i64, i64) = self.conn.query_row(
      "SELECT COUNT(*) FILTER (WHERE rating = 1),
              COUNT(*) FILTER (WHERE rating = -1)
       FROM ratings WHERE song_id = ?1",
      rusqlite::params![song.0],
      |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(Aggregate { thumbs_up: decode_count(up), thumbs_down: decode_count(down) })
  }
}

// ─── RatingStore impl ────────────────────────────────────────────────────────

impl RatingStore for SqliteStore {
  type Error = Error;

  async fn ensure_song(&self, song: NewSong) -> Result<SongInsert> {
    let outcome = self
      .write(move |tx| block_on(ensure_song_in(tx, &song)))
      .await?;
    if let SongInsert::Inserted(id) = outcome {
      tracing::debug!(song_id = id.0, "created song");
    }
    Ok(outcome)
  }

  async fn submit_rating(&self, submission: Submission) -> Result<Aggregate> {
    let song_hash = submission.song.song_hash.clone();
    let aggregate = self
      .write(move |tx| block_on(submit_in(tx, &submission)))
      .await?;
    tracing::debug!(%song_hash, ?aggregate, "rating stored");
    Ok(aggregate)
  }

  async fn get_aggregate(&self, song_hash: &str) -> Result<Aggregate> {
    let hash = song_hash.to_owned();

    let (up, down): (i64, i64) = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FILTER (WHERE r.rating = 1),
                  COUNT(*) FILTER (WHERE r.rating = -1)
           FROM ratings r
           JOIN songs s ON s.id = r.song_id
           WHERE s.song_hash = ?1",
          rusqlite::params![hash],
          |row| Ok((row.get(0)?, row.get(1)?)),
        )?)
      })
      .await?;

    Ok(Aggregate { thumbs_up: decode_count(up), thumbs_down: decode_count(down) })
  }

  async fn get_user_rating(&self, song_hash: &str, user_id: &str) -> Result<Option<Thumb>> {
    let hash = song_hash.to_owned();
    let user = user_id.to_owned();

    let raw: Option<i64> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT r.rating
               FROM ratings r
               JOIN songs s ON s.id = r.song_id
               WHERE s.song_hash = ?1 AND r.user_id = ?2",
              rusqlite::params![hash, user],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(decode_thumb).transpose()
  }

  async fn get_song(&self, song_hash: &str) -> Result<Option<Song>> {
    let hash = song_hash.to_owned();

    let raw: Option<RawSong> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT id, song_hash, title, artist, album, created_at
               FROM songs WHERE song_hash = ?1",
              rusqlite::params![hash],
              |row| {
                Ok(RawSong {
                  id:         row.get(0)?,
                  song_hash:  row.get(1)?,
                  title:      row.get(2)?,
                  artist:     row.get(3)?,
                  album:      row.get(4)?,
                  created_at: row.get(5)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSong::into_song).transpose()
  }
}
