//! Router-level tests against an in-memory SQLite store.

use std::{io, net::SocketAddr, sync::Arc};

use airwave_core::{
  hash,
  rating::{Aggregate, NewSong, Song, SongInsert, Submission, Thumb},
  store::RatingStore,
};
use airwave_store_sqlite::SqliteStore;
use axum::{
  Router,
  body::Body,
  extract::ConnectInfo,
  http::{Request, StatusCode, header},
  response::Response,
};
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::api_router;

async fn app() -> (Router, Arc<SqliteStore>) {
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  (Router::new().nest("/api", api_router(store.clone())), store)
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
  let resp: Response = app.clone().oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .unwrap();
  let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
  (status, body)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
  send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post(app: &Router, uri: &str, body: &str) -> (StatusCode, Value) {
  let req = Request::post(uri)
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from(body.to_owned()))
    .unwrap();
  send(app, req).await
}

async fn rate(app: &Router, hash: &str, body: Value) -> (StatusCode, Value) {
  post(app, &format!("/api/song/{hash}/rate"), &body.to_string()).await
}

fn vote(user: &str, rating: i64) -> Value {
  json!({ "rating": rating, "userId": user, "title": "T", "artist": "A" })
}

// ── GET ratings ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_song_has_zero_counts() {
  let (app, _) = app().await;
  let (status, body) = get(&app, "/api/song/never-seen-hash/ratings").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "thumbs_up": 0, "thumbs_down": 0 }));
}

#[tokio::test]
async fn unknown_user_rating_is_null() {
  let (app, _) = app().await;
  let (status, body) = get(&app, "/api/song/never-seen-hash/user-rating/anyone").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "rating": null }));
}

// ── POST rate ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn rate_returns_message_and_counts() {
  let (app, _) = app().await;

  let (status, body) = rate(&app, "abc", vote("u1", 1)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(
    body,
    json!({ "message": "Rating saved", "thumbs_up": 1, "thumbs_down": 0 })
  );

  let (_, body) = rate(&app, "abc", vote("u2", -1)).await;
  assert_eq!(body["thumbs_up"], 1);
  assert_eq!(body["thumbs_down"], 1);

  let (_, body) = rate(&app, "abc", vote("u1", -1)).await;
  assert_eq!(body["thumbs_up"], 0);
  assert_eq!(body["thumbs_down"], 2);

  let (_, body) = get(&app, "/api/song/abc/ratings").await;
  assert_eq!(body, json!({ "thumbs_up": 0, "thumbs_down": 2 }));

  let (_, body) = get(&app, "/api/song/abc/user-rating/u1").await;
  assert_eq!(body, json!({ "rating": -1 }));
}

#[tokio::test]
async fn album_is_optional_and_stored() {
  let (app, store) = app().await;
  let body = json!({ "rating": 1, "userId": "u", "title": "T", "artist": "A", "album": "LP" });
  let (status, _) = rate(&app, "withalbum", body).await;
  assert_eq!(status, StatusCode::OK);

  let song = store.get_song("withalbum").await.unwrap().unwrap();
  assert_eq!(song.album.as_deref(), Some("LP"));
}

#[tokio::test]
async fn out_of_range_rating_is_rejected_without_writing() {
  let (app, store) = app().await;
  for bad in [0, 2, -5] {
    let (status, body) = rate(&app, "abc", vote("u1", bad)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("invalid rating"));
  }
  assert!(store.get_song("abc").await.unwrap().is_none());
}

#[tokio::test]
async fn missing_fields_are_rejected() {
  let (app, store) = app().await;
  let cases = [
    (json!({ "userId": "u", "title": "T", "artist": "A" }), "rating"),
    (json!({ "rating": 1, "title": "T", "artist": "A" }), "userId"),
    (json!({ "rating": 1, "userId": "u", "artist": "A" }), "title"),
    (json!({ "rating": 1, "userId": "u", "title": "T", "artist": "" }), "artist"),
  ];
  for (body, field) in cases {
    let (status, resp) = rate(&app, "abc", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{field}");
    assert!(resp["error"].as_str().unwrap().contains(field), "{resp}");
  }
  assert!(store.get_song("abc").await.unwrap().is_none());
}

#[tokio::test]
async fn malformed_json_is_a_400_with_error_body() {
  let (app, _) = app().await;
  let (status, body) = post(&app, "/api/song/abc/rate", "{not json").await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].is_string());

  let (status, _) = rate(&app, "abc", json!({ "rating": "1", "userId": "u", "title": "T", "artist": "A" })).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reserved_characters_in_user_id_round_trip() {
  let (app, _) = app().await;
  let (status, _) = rate(&app, "abc", vote("me#2", -1)).await;
  assert_eq!(status, StatusCode::OK);
  rate(&app, "abc", vote("me", 1)).await;

  let (_, body) = get(&app, "/api/song/abc/user-rating/me%232").await;
  assert_eq!(body, json!({ "rating": -1 }));
  let (_, body) = get(&app, "/api/song/abc/user-rating/me").await;
  assert_eq!(body, json!({ "rating": 1 }));
}

// ── Storage failures ─────────────────────────────────────────────────────────

const DISK_ERROR: &str = "disk I/O error: /var/lib/airwave/airwave.db";

/// A backend whose every call fails with a low-level error.
struct BrokenStore;

fn broken<T>() -> Result<T, io::Error> { Err(io::Error::other(DISK_ERROR)) }

impl RatingStore for BrokenStore {
  type Error = io::Error;

  async fn ensure_song(&self, _: NewSong) -> Result<SongInsert, io::Error> { broken() }

  async fn submit_rating(&self, _: Submission) -> Result<Aggregate, io::Error> { broken() }

  async fn get_aggregate(&self, _: &str) -> Result<Aggregate, io::Error> { broken() }

  async fn get_user_rating(&self, _: &str, _: &str) -> Result<Option<Thumb>, io::Error> {
    broken()
  }

  async fn get_song(&self, _: &str) -> Result<Option<Song>, io::Error> { broken() }
}

#[tokio::test]
async fn storage_errors_are_500_with_fixed_message() {
  let app = Router::new().nest("/api", api_router(Arc::new(BrokenStore)));

  let (status, body) = rate(&app, "abc", vote("u1", 1)).await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  assert_eq!(body, json!({ "error": "failed to save rating" }));

  let (status, body) = get(&app, "/api/song/abc/ratings").await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  assert_eq!(body, json!({ "error": "failed to load ratings" }));

  let (status, body) = get(&app, "/api/song/abc/user-rating/u1").await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  assert_eq!(body, json!({ "error": "failed to load user rating" }));
  assert!(!body.to_string().contains("disk I/O"));
}

#[tokio::test]
async fn validation_still_wins_over_a_broken_store() {
  let app = Router::new().nest("/api", api_router(Arc::new(BrokenStore)));
  let (status, body) = rate(&app, "abc", vote("u1", 0)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("invalid rating"));
}

// ── Helpers ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn song_hash_endpoint_matches_core() {
  let (app, _) = app().await;
  let (status, body) = post(
    &app,
    "/api/song-hash",
    &json!({ "artist": "Artist", "title": "Title" }).to_string(),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["song_hash"], hash::song_hash("Artist", "Title", None));
}

#[tokio::test]
async fn song_hash_rejects_non_string_fields() {
  let (app, _) = app().await;
  let (status, body) = post(
    &app,
    "/api/song-hash",
    &json!({ "artist": 7, "title": "Title" }).to_string(),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("invalid argument"));
}

#[tokio::test]
async fn client_ip_prefers_forwarded_header() {
  let (app, _) = app().await;
  let req = Request::get("/api/client-ip")
    .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
    .body(Body::empty())
    .unwrap();
  let (status, body) = send(&app, req).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "ip": "203.0.113.9" }));
}

#[tokio::test]
async fn client_ip_falls_back_to_peer() {
  let (app, _) = app().await;
  let mut req = Request::get("/api/client-ip").body(Body::empty()).unwrap();
  req
    .extensions_mut()
    .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 4], 5555))));
  let (_, body) = send(&app, req).await;
  assert_eq!(body, json!({ "ip": "192.0.2.4" }));
}

#[tokio::test]
async fn health_is_ok() {
  let (app, _) = app().await;
  let (status, body) = get(&app, "/api/health").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "ok");
}
