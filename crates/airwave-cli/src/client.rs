//! Async HTTP client wrapping the Airwave JSON API.

use std::time::Duration;

use airwave_core::rating::{Aggregate, Thumb};
use anyhow::{Context, Result, anyhow, bail};
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// A rating to submit, mirroring the `POST .../rate` body.
#[derive(Debug, Clone, Serialize)]
pub struct RateRequest {
  pub rating:  Thumb,
  #[serde(rename = "userId")]
  pub user_id: String,
  pub title:   String,
  pub artist:  String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub album:   Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RateResponse {
  pub message:   String,
  #[serde(flatten)]
  pub aggregate: Aggregate,
}

#[derive(Debug, Deserialize)]
struct UserRating {
  rating: Option<Thumb>,
}

#[derive(Debug, Deserialize)]
struct ClientIp {
  ip: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
  error: String,
}

/// Async HTTP client for the Airwave JSON API.
///
/// Cheap to clone. The inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client:   Client,
  base_url: Url,
}

impl ApiClient {
  pub fn new(base_url: &str) -> Result<Self> {
    let base_url =
      Url::parse(base_url).with_context(|| format!("invalid server URL {base_url:?}"))?;
    if base_url.cannot_be_a_base() {
      bail!("server URL {base_url} cannot carry a path");
    }
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, base_url })
  }

  /// `{base}/api/{segments...}`, each segment percent-encoded on its own so a
  /// `/`, `?` or `#` inside a hash or user id stays part of that segment.
  fn url(&self, segments: &[&str]) -> Url {
    let mut url = self.base_url.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().push("api").extend(segments);
    }
    url
  }

  /// `GET /api/song/{hash}/ratings`
  pub async fn ratings(&self, song_hash: &str) -> Result<Aggregate> {
    let url = self.url(&["song", song_hash, "ratings"]);
    let resp = self.client.get(url.clone()).send().await;
    decode(&url, resp).await
  }

  /// `POST /api/song/{hash}/rate`
  pub async fn rate(&self, song_hash: &str, body: &RateRequest) -> Result<RateResponse> {
    let url = self.url(&["song", song_hash, "rate"]);
    let resp = self.client.post(url.clone()).json(body).send().await;
    decode(&url, resp).await
  }

  /// `GET /api/song/{hash}/user-rating/{user}`
  pub async fn user_rating(&self, song_hash: &str, user_id: &str) -> Result<Option<Thumb>> {
    let url = self.url(&["song", song_hash, "user-rating", user_id]);
    let resp = self.client.get(url.clone()).send().await;
    let body: UserRating = decode(&url, resp).await?;
    Ok(body.rating)
  }

  /// `GET /api/client-ip`
  pub async fn client_ip(&self) -> Result<String> {
    let url = self.url(&["client-ip"]);
    let resp = self.client.get(url.clone()).send().await;
    let body: ClientIp = decode(&url, resp).await?;
    Ok(body.ip)
  }
}

/// Turn a response into `T`, surfacing the server's `{"error"}` message on
/// failure.
async fn decode<T: DeserializeOwned>(
  url: &Url,
  resp: reqwest::Result<Response>,
) -> Result<T> {
  let path = url.path();
  let resp = resp.with_context(|| format!("request to {path} failed"))?;
  let status = resp.status();
  tracing::debug!(%status, path, "response");

  if !status.is_success() {
    let message = resp
      .json::<ErrorBody>()
      .await
      .map(|b| b.error)
      .unwrap_or_default();
    return Err(anyhow!("{path} → {status}: {message}"));
  }
  resp.json().await.with_context(|| format!("deserialising {path}"))
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn rate_request_matches_api_shape() {
    let req = RateRequest {
      rating:  Thumb::Down,
      user_id: "u1".into(),
      title:   "T".into(),
      artist:  "A".into(),
      album:   None,
    };
    assert_eq!(
      serde_json::to_value(&req).unwrap(),
      json!({ "rating": -1, "userId": "u1", "title": "T", "artist": "A" })
    );
  }

  #[test]
  fn rate_response_flattens_counts() {
    let resp: RateResponse = serde_json::from_value(json!({
      "message": "Rating saved", "thumbs_up": 3, "thumbs_down": 1
    }))
    .unwrap();
    assert_eq!(resp.aggregate, Aggregate { thumbs_up: 3, thumbs_down: 1 });
  }

  #[test]
  fn url_joins_base_and_api_prefix() {
    let c = ApiClient::new("http://localhost:3000/").unwrap();
    assert_eq!(c.url(&["health"]).as_str(), "http://localhost:3000/api/health");

    let c = ApiClient::new("http://radio.example/airwave").unwrap();
    assert_eq!(
      c.url(&["client-ip"]).as_str(),
      "http://radio.example/airwave/api/client-ip"
    );
  }

  #[test]
  fn url_escapes_reserved_characters_in_segments() {
    let c = ApiClient::new("http://localhost:3000").unwrap();

    let url = c.url(&["song", "abc", "user-rating", "me#2"]);
    assert_eq!(url.path(), "/api/song/abc/user-rating/me%232");
    assert_eq!(url.fragment(), None);
    let last = url.path_segments().and_then(|mut s| s.next_back()).unwrap();
    assert_eq!(last, "me%232");

    let url = c.url(&["song", "a/b?c", "ratings"]);
    assert_eq!(url.path(), "/api/song/a%2Fb%3Fc/ratings");
    assert_eq!(url.query(), None);
  }

  #[test]
  fn rejects_unusable_base_urls() {
    assert!(ApiClient::new("not a url").is_err());
    assert!(ApiClient::new("mailto:radio@example.com").is_err());
  }
}
