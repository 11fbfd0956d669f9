//! [`PostgresStore`]: the PostgreSQL implementation of [`RatingStore`].

use std::{future::Future, str::FromStr, time::Duration};

use airwave_core::{
  rating::{Aggregate, NewSong, Song, SongId, SongInsert, Submission, Thumb},
  schema::{self, Dialect},
  store::RatingStore,
  tx::{RatingTx, ensure_song_in, submit_in},
};
use chrono::{DateTime, Utc};
use sqlx::{
  PgPool, Postgres, Transaction,
  postgres::{PgConnectOptions, PgPoolOptions},
};

use crate::{Error, Result};

/// Advisory lock key serialising schema creation across server processes.
const SCHEMA_LOCK_KEY: i64 = 0x6169_7277_6176_65;

// ─── Options ─────────────────────────────────────────────────────────────────

/// Connection tuning for [`PostgresStore::connect`].
#[derive(Debug, Clone)]
pub struct PgOptions {
  pub max_connections:      u32,
  /// Server-side `statement_timeout`, if any.
  pub statement_timeout_ms: Option<u64>,
  /// Upper bound on one write transaction, begin to commit.
  pub transaction_timeout:  Duration,
}

impl Default for PgOptions {
  fn default() -> Self {
    Self {
      max_connections:      5,
      statement_timeout_ms: None,
      transaction_timeout:  Duration::from_secs(5),
    }
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A rating store backed by a PostgreSQL connection pool.
///
/// Cloning is cheap. The pool is reference-counted.
#[derive(Clone)]
pub struct PostgresStore {
  pub(crate) pool: PgPool,
  tx_timeout:      Duration,
}

impl PostgresStore {
  /// Connect to `url` and run schema initialisation.
  pub async fn connect(url: &str, options: PgOptions) -> Result<Self> {
    let mut connect = PgConnectOptions::from_str(url)?;
    if let Some(ms) = options.statement_timeout_ms {
      connect = connect.options([("statement_timeout", format!("{ms}ms"))]);
      tracing::info!("PostgreSQL statement_timeout set to {ms}ms");
    }

    let pool = PgPoolOptions::new()
      .max_connections(options.max_connections)
      .connect_with(connect)
      .await?;

    Self::from_pool(pool, options.transaction_timeout).await
  }

  /// Wrap an existing pool and run schema initialisation.
  pub async fn from_pool(pool: PgPool, tx_timeout: Duration) -> Result<Self> {
    let store = Self { pool, tx_timeout };
    store.init_schema().await?;
    Ok(store)
  }

  pub(crate) async fn init_schema(&self) -> Result<()> {
    // Two servers starting at once can both miss `IF NOT EXISTS` and collide
    // on the catalog, so creation runs under a transaction-scoped lock.
    let mut tx = self.pool.begin().await?;
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
      .bind(SCHEMA_LOCK_KEY)
      .execute(&mut *tx)
      .await?;
    for stmt in schema::statements(Dialect::Postgres) {
      sqlx::query(&stmt).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    tracing::debug!("postgres schema ready");
    Ok(())
  }

  async fn begin(&self) -> Result<PgTx> {
    Ok(PgTx { tx: self.pool.begin().await? })
  }

  /// Run `fut` under the transaction timeout.
  ///
  /// On expiry the future is dropped, which drops its open transaction and
  /// rolls it back.
  async fn bounded<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(self.tx_timeout, fut)
      .await
      .map_err(|_| Error::Timeout(self.tx_timeout))?
  }
}

// ─── Transaction steps ───────────────────────────────────────────────────────

/// [`RatingTx`] over an open `sqlx` transaction.
struct PgTx {
  tx: Transaction<'static, Postgres>,
}

impl PgTx {
  async fn commit(self) -> Result<()> {
    self.tx.commit().await?;
    Ok(())
  }
}

impl RatingTx for PgTx {
  type Error = Error;

  async fn insert_song(
    &mut self,
    song: &NewSong,
    created_at: DateTime<Utc>,
  ) -> Result<Option<SongId>> {
    let id: Option<i64> = sqlx::query_scalar(
      "INSERT INTO songs (title, artist, album, song_hash, created_at)
       VALUES ($1, $2, $3, $4, $5)
       ON CONFLICT (song_hash) DO NOTHING
       RETURNING id",
    )
    .bind(&song.title)
    .bind(&song.artist)
    .bind(&song.album)
    .bind(&song.song_hash)
    .bind(created_at)
    .fetch_optional(&mut *self.tx)
    .await?;
    Ok(id.map(SongId))
  }

  async fn find_song_id(&mut self, song_hash: &str) -> Result<Option<SongId>> {
    let id: Option<i64> = sqlx::query_scalar("SELECT id FROM songs WHERE song_hash = $1")
      .bind(song_hash)
      .fetch_optional(&mut *self.tx)
      .await?;
    Ok(id.map(SongId))
  }

  async fn upsert_rating(
    &mut self,
    song: SongId,
    user_id: &str,
    thumb: Thumb,
    created_at: DateTime<Utc>,
  ) -> Result<()> {
    sqlx::query(
      "INSERT INTO ratings (song_id, user_id, rating, created_at)
       VALUES ($1, $2, $3, $4)
       ON CONFLICT (song_id, user_id) DO UPDATE SET rating = EXCLUDED.rating",
    )
    .bind(song.0)
    .bind(user_id)
    .bind(rating_column(thumb))
    .bind(created_at)
    .execute(&mut *self.tx)
    .await?;
    Ok(())
  }

  async fn count_ratings(&mut self, song: SongId) -> Result<Aggregate> {
    let counts: (i64, i64) = sqlx::query_as(
      "SELECT COUNT(*) FILTER (WHERE rating = 1),
              COUNT(*) FILTER (WHERE rating = -1)
       FROM ratings WHERE song_id = $1",
    )
    .bind(song.0)
    .fetch_one(&mut *self.tx)
    .await?;
    Ok(aggregate(counts))
  }
}

/// `ratings.rating` is an `INTEGER` column.
fn rating_column(thumb: Thumb) -> i32 {
  match thumb {
    Thumb::Up => 1,
    Thumb::Down => -1,
  }
}

fn aggregate((up, down): (i64, i64)) -> Aggregate {
  Aggregate {
    thumbs_up:   u64::try_from(up).unwrap_or_default(),
    thumbs_down: u64::try_from(down).unwrap_or_default(),
  }
}

// ─── RatingStore impl ────────────────────────────────────────────────────────

impl RatingStore for PostgresStore {
  type Error = Error;

  async fn ensure_song(&self, song: NewSong) -> Result<SongInsert> {
    let outcome = self
      .bounded(async {
        let mut tx = self.begin().await?;
        let outcome = ensure_song_in(&mut tx, &song).await?;
        tx.commit().await?;
        Ok::<_, Error>(outcome)
      })
      .await?;
    if let SongInsert::Inserted(id) = outcome {
      tracing::debug!(song_id = id.0, "created song");
    }
    Ok(outcome)
  }

  async fn submit_rating(&self, submission: Submission) -> Result<Aggregate> {
    let aggregate = self
      .bounded(async {
        let mut tx = self.begin().await?;
        let aggregate = submit_in(&mut tx, &submission).await?;
        tx.commit().await?;
        Ok::<_, Error>(aggregate)
      })
      .await?;
    tracing::debug!(song_hash = %submission.song.song_hash, ?aggregate, "rating stored");
    Ok(aggregate)
  }

  async fn get_aggregate(&self, song_hash: &str) -> Result<Aggregate> {
    let counts: (i64, i64) = sqlx::query_as(
      "SELECT COUNT(*) FILTER (WHERE r.rating = 1),
              COUNT(*) FILTER (WHERE r.rating = -1)
       FROM ratings r
       JOIN songs s ON s.id = r.song_id
       WHERE s.song_hash = $1",
    )
    .bind(song_hash)
    .fetch_one(&self.pool)
    .await?;
    Ok(aggregate(counts))
  }

  async fn get_user_rating(&self, song_hash: &str, user_id: &str) -> Result<Option<Thumb>> {
    let raw: Option<i32> = sqlx::query_scalar(
      "SELECT r.rating
       FROM ratings r
       JOIN songs s ON s.id = r.song_id
       WHERE s.song_hash = $1 AND r.user_id = $2",
    )
    .bind(song_hash)
    .bind(user_id)
    .fetch_optional(&self.pool)
    .await?;

    Ok(raw.map(|v| Thumb::try_from(i64::from(v))).transpose()?)
  }

  async fn get_song(&self, song_hash: &str) -> Result<Option<Song>> {
    let row: Option<(i64, String, String, String, Option<String>, DateTime<Utc>)> =
      sqlx::query_as(
        "SELECT id, song_hash, title, artist, album, created_at
         FROM songs WHERE song_hash = $1",
      )
      .bind(song_hash)
      .fetch_optional(&self.pool)
      .await?;

    Ok(row.map(|(id, song_hash, title, artist, album, created_at)| Song {
      id: SongId(id),
      song_hash,
      title,
      artist,
      album,
      created_at,
    }))
  }
}
