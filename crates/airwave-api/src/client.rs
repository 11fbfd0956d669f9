//! Handler for `GET /client-ip`.
//!
//! The player folds the address into its anonymous client fingerprint. Behind
//! a reverse proxy the peer address is the proxy's, so forwarding headers win.

use std::net::SocketAddr;

use axum::{
  Json,
  extract::{ConnectInfo, Request},
  http::HeaderMap,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientIp {
  pub ip: String,
}

/// `GET /client-ip`
pub async fn client_ip(req: Request) -> Json<ClientIp> {
  let peer = req
    .extensions()
    .get::<ConnectInfo<SocketAddr>>()
    .map(|ConnectInfo(addr)| addr.ip().to_string());
  let ip = forwarded_ip(req.headers())
    .or(peer)
    .unwrap_or_else(|| "unknown".to_owned());
  Json(ClientIp { ip })
}

/// First `X-Forwarded-For` entry, else `X-Real-IP`.
fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
  let header = |name: &str| {
    headers
      .get(name)
      .and_then(|v| v.to_str().ok())
      .map(str::trim)
      .filter(|v| !v.is_empty())
  };

  header("x-forwarded-for")
    .and_then(|v| v.split(',').next())
    .map(str::trim)
    .filter(|v| !v.is_empty())
    .or_else(|| header("x-real-ip"))
    .map(str::to_owned)
}
