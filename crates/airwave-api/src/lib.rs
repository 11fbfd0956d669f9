//! JSON REST API for Airwave.
//!
//! Exposes an axum [`Router`] backed by any [`airwave_core::store::RatingStore`].
//! Static files, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", airwave_api::api_router(store.clone()))
//! ```

pub mod client;
pub mod error;
pub mod songs;

use std::sync::Arc;

use airwave_core::store::RatingStore;
use axum::{
  Json, Router,
  routing::{get, post},
};
use serde_json::{Value, json};

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: RatingStore + 'static,
{
  Router::new()
    // Ratings
    .route("/song/{song_hash}/ratings", get(songs::ratings::<S>))
    .route("/song/{song_hash}/rate", post(songs::rate::<S>))
    .route(
      "/song/{song_hash}/user-rating/{user_id}",
      get(songs::user_rating::<S>),
    )
    // Helpers
    .route("/song-hash", post(songs::song_hash))
    .route("/client-ip", get(client::client_ip))
    .route("/health", get(health))
    .with_state(store)
}

/// `GET /health`
async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }

#[cfg(test)]
mod tests;
