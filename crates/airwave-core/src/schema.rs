//! Table definitions shared by every backend.
//!
//! One definition is rendered per SQL dialect so that the uniqueness and
//! check constraints the rating state machine relies on are spelled the same
//! way in the embedded and the client/server store. Statements are returned
//! individually because Postgres cannot prepare several at once.

/// The SQL flavour a schema is rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
  Sqlite,
  Postgres,
}

impl Dialect {
  fn serial_key(self) -> &'static str {
    match self {
      Self::Sqlite => "INTEGER PRIMARY KEY AUTOINCREMENT",
      Self::Postgres => "BIGSERIAL PRIMARY KEY",
    }
  }

  fn foreign_key(self) -> &'static str {
    match self {
      Self::Sqlite => "INTEGER",
      Self::Postgres => "BIGINT",
    }
  }

  /// Timestamp column with a storage-supplied default.
  fn timestamp(self) -> &'static str {
    match self {
      Self::Sqlite => "TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
      Self::Postgres => "TIMESTAMPTZ NOT NULL DEFAULT now()",
    }
  }
}

/// Table names in creation order; `ratings` references `songs`.
pub const TABLES: [&str; 3] = ["users", "songs", "ratings"];

/// `CREATE ... IF NOT EXISTS` statements for `dialect`, in dependency order.
pub fn statements(dialect: Dialect) -> Vec<String> {
  let pk = dialect.serial_key();
  let fk = dialect.foreign_key();
  let ts = dialect.timestamp();

  vec![
    // Legacy account table. Ratings do not reference it.
    format!(
      "CREATE TABLE IF NOT EXISTS users (
         id         {pk},
         name       TEXT NOT NULL,
         email      TEXT NOT NULL UNIQUE,
         created_at {ts}
       )"
    ),
    format!(
      "CREATE TABLE IF NOT EXISTS songs (
         id         {pk},
         title      TEXT NOT NULL,
         artist     TEXT NOT NULL,
         album      TEXT,
         song_hash  TEXT NOT NULL UNIQUE,
         created_at {ts}
       )"
    ),
    format!(
      "CREATE TABLE IF NOT EXISTS ratings (
         id         {pk},
         song_id    {fk} NOT NULL REFERENCES songs(id),
         user_id    TEXT NOT NULL,
         rating     INTEGER NOT NULL CHECK (rating IN (-1, 1)),
         created_at {ts},
         UNIQUE (song_id, user_id)
       )"
    ),
  ]
}
