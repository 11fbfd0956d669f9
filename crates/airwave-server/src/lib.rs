//! HTTP server for Airwave: the rating API plus the static web player.

use std::{
  net::SocketAddr,
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use airwave_core::store::RatingStore;
use airwave_store_postgres::PgOptions;
use anyhow::Context as _;
use axum::Router;
use serde::Deserialize;
use tokio::{net::TcpListener, signal};
use tower_http::{services::ServeDir, trace::TraceLayer};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Which storage backend to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
  Sqlite,
  Postgres,
}

/// Runtime server configuration, deserialised from `airwave.toml` and
/// `AIRWAVE_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                     String,
  pub port:                     u16,
  pub backend:                  Backend,
  pub sqlite_path:              PathBuf,
  pub postgres_url:             Option<String>,
  pub postgres_max_connections: u32,
  pub statement_timeout_ms:     Option<u64>,
  pub transaction_timeout_ms:   u64,
  /// Directory holding the web player; served at `/` when set.
  pub static_dir:               Option<PathBuf>,
}

impl ServerConfig {
  /// Layer defaults, the optional TOML file at `path`, then the environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .set_default("host", "0.0.0.0")?
      .set_default("port", 3000)?
      .set_default("backend", "sqlite")?
      .set_default("sqlite_path", "airwave.db")?
      .set_default("postgres_max_connections", 5)?
      .set_default("transaction_timeout_ms", 5000)?
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("AIRWAVE"))
      .build()?
      .try_deserialize()
  }

  pub fn pg_options(&self) -> PgOptions {
    PgOptions {
      max_connections:      self.postgres_max_connections,
      statement_timeout_ms: self.statement_timeout_ms,
      transaction_timeout:  Duration::from_millis(self.transaction_timeout_ms),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router: `/api` plus optional static files.
pub fn router<S>(store: Arc<S>, static_dir: Option<&Path>) -> Router
where
  S: RatingStore + 'static,
{
  let app = Router::new().nest("/api", airwave_api::api_router(store));
  let app = match static_dir {
    Some(dir) => app.fallback_service(ServeDir::new(dir)),
    None => app,
  };
  app.layer(TraceLayer::new_for_http())
}

/// Bind and serve until Ctrl-C or SIGTERM.
pub async fn serve<S>(store: Arc<S>, config: &ServerConfig) -> anyhow::Result<()>
where
  S: RatingStore + 'static,
{
  let app = router(store, config.static_dir.as_deref());
  let address = format!("{}:{}", config.host, config.port);

  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;
  tracing::info!("Listening on http://{address}");

  axum::serve(
    listener,
    app.into_make_service_with_connect_info::<SocketAddr>(),
  )
  .with_graceful_shutdown(shutdown_signal())
  .await
  .context("server error")?;

  tracing::info!("Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  let ctrl_c = async {
    match signal::ctrl_c().await {
      Ok(()) => tracing::info!("Received Ctrl+C, shutting down"),
      Err(e) => {
        tracing::warn!("Failed to install Ctrl+C handler: {e}");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
      Ok(mut sig) => {
        sig.recv().await;
        tracing::info!("Received terminate signal, shutting down");
      }
      Err(e) => {
        tracing::warn!("Failed to install SIGTERM handler: {e}");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {},
    _ = terminate => {},
  }
}
