//! airwave-server binary.
//!
//! Reads `airwave.toml` (or the path specified with `--config`), opens the
//! configured rating store, and serves the API and web player over HTTP.
//!
//! ```
//! AIRWAVE_BACKEND=postgres AIRWAVE_POSTGRES_URL=postgres://... airwave-server
//! ```

use std::{path::PathBuf, sync::Arc};

use airwave_server::{Backend, ServerConfig};
use airwave_store_postgres::PostgresStore;
use airwave_store_sqlite::SqliteStore;
use anyhow::Context as _;
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Airwave radio rating server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "airwave.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let config = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  // Any failure opening the store or applying the schema ends the process
  // before a single request is accepted.
  match config.backend {
    Backend::Sqlite => {
      let store = SqliteStore::open(&config.sqlite_path)
        .await
        .with_context(|| format!("failed to open store at {:?}", config.sqlite_path))?;
      tracing::info!(path = ?config.sqlite_path, "Opened SQLite store");
      airwave_server::serve(Arc::new(store), &config).await
    }
    Backend::Postgres => {
      let url = config
        .postgres_url
        .as_deref()
        .context("postgres_url is required when backend = \"postgres\"")?;
      let store = PostgresStore::connect(url, config.pg_options())
        .await
        .context("failed to connect to PostgreSQL")?;
      tracing::info!("Connected to PostgreSQL store");
      airwave_server::serve(Arc::new(store), &config).await
    }
  }
}
