//! Handlers for `/song/...` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/song/{song_hash}/ratings` | Zero counts for unknown songs |
//! | `POST` | `/song/{song_hash}/rate` | Body: [`RateBody`] |
//! | `GET`  | `/song/{song_hash}/user-rating/{user_id}` | `{"rating": 1 \| -1 \| null}` |
//! | `POST` | `/song-hash` | Body: `{"artist","title","album"?}` |

use std::sync::Arc;

use airwave_core::{
  hash,
  rating::{Aggregate, Submission, Thumb},
  store::RatingStore,
};
use axum::{
  Json,
  extract::{Path, State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

// ─── Read ─────────────────────────────────────────────────────────────────────

/// `GET /song/{song_hash}/ratings`
pub async fn ratings<S>(
  State(store): State<Arc<S>>,
  Path(song_hash): Path<String>,
) -> Result<Json<Aggregate>, ApiError>
where
  S: RatingStore,
{
  let aggregate = store
    .get_aggregate(&song_hash)
    .await
    .map_err(ApiError::store("failed to load ratings"))?;
  Ok(Json(aggregate))
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRating {
  pub rating: Option<Thumb>,
}

/// `GET /song/{song_hash}/user-rating/{user_id}`
pub async fn user_rating<S>(
  State(store): State<Arc<S>>,
  Path((song_hash, user_id)): Path<(String, String)>,
) -> Result<Json<UserRating>, ApiError>
where
  S: RatingStore,
{
  let rating = store
    .get_user_rating(&song_hash, &user_id)
    .await
    .map_err(ApiError::store("failed to load user rating"))?;
  Ok(Json(UserRating { rating }))
}

// ─── Rate ─────────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /song/{song_hash}/rate`.
///
/// Every field is optional at the JSON level so that a missing field is
/// reported by name instead of as a generic deserialisation failure.
#[derive(Debug, Deserialize)]
pub struct RateBody {
  pub rating:  Option<i64>,
  #[serde(rename = "userId")]
  pub user_id: Option<String>,
  pub title:   Option<String>,
  pub artist:  Option<String>,
  pub album:   Option<String>,
}

impl RateBody {
  fn into_submission(self, song_hash: String) -> Result<Submission, ApiError> {
    let rating = self
      .rating
      .ok_or(airwave_core::Error::MissingField("rating"))?;
    Ok(Submission::new(
      song_hash,
      self.user_id.unwrap_or_default(),
      rating,
      self.title.unwrap_or_default(),
      self.artist.unwrap_or_default(),
      self.album,
    )?)
  }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateResponse {
  pub message:   String,
  #[serde(flatten)]
  pub aggregate: Aggregate,
}

/// `POST /song/{song_hash}/rate`: returns the song's updated counts.
pub async fn rate<S>(
  State(store): State<Arc<S>>,
  Path(song_hash): Path<String>,
  body: Result<Json<RateBody>, JsonRejection>,
) -> Result<Json<RateResponse>, ApiError>
where
  S: RatingStore,
{
  let Json(body) = body?;
  let submission = body.into_submission(song_hash)?;
  let aggregate = store
    .submit_rating(submission)
    .await
    .map_err(ApiError::store("failed to save rating"))?;
  Ok(Json(RateResponse { message: "Rating saved".to_owned(), aggregate }))
}

// ─── Hash ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SongHash {
  pub song_hash: String,
}

/// `POST /song-hash`: derive the key the player uses for a track.
pub async fn song_hash(
  body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SongHash>, ApiError> {
  let Json(body) = body?;
  let song_hash = hash::song_hash_value(
    &body["artist"],
    &body["title"],
    body.get("album"),
  )?;
  Ok(Json(SongHash { song_hash }))
}
