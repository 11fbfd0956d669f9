//! Identity hashing for song keys.
//!
//! The hash is a 32-bit rolling hash over UTF-16 code units, rendered as the
//! base-36 absolute value. The browser player derives the same token for the
//! tracks it displays, so the algorithm must never change: stored `song_hash`
//! values in either backend depend on it.

use serde_json::Value;

use crate::{Error, Result};

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Hash `s` into a short alphanumeric token.
///
/// Deterministic and order-sensitive, not collision resistant.
pub fn identity_hash(s: &str) -> String {
  let h = s
    .encode_utf16()
    .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)));
  to_base36(h.unsigned_abs())
}

/// The external key of a track: `hash(lower(artist_title_album))`.
///
/// A missing album hashes exactly like an empty one.
pub fn song_hash(artist: &str, title: &str, album: Option<&str>) -> String {
  let key = format!("{artist}_{title}_{}", album.unwrap_or_default());
  identity_hash(&key.to_lowercase())
}

/// [`song_hash`] over loosely typed JSON fields.
///
/// Every present field must be a JSON string; `null` album counts as absent.
pub fn song_hash_value(
  artist: &Value,
  title: &Value,
  album: Option<&Value>,
) -> Result<String> {
  let artist = expect_str("artist", artist)?;
  let title = expect_str("title", title)?;
  let album = match album {
    None | Some(Value::Null) => None,
    Some(v) => Some(expect_str("album", v)?),
  };
  Ok(song_hash(artist, title, album))
}

fn expect_str<'a>(field: &str, v: &'a Value) -> Result<&'a str> {
  v.as_str()
    .ok_or_else(|| Error::InvalidArgument(format!("{field} must be a string, got {v}")))
}

fn to_base36(mut n: u32) -> String {
  if n == 0 {
    return "0".to_owned();
  }
  let mut digits = Vec::with_capacity(7);
  while n > 0 {
    digits.push(BASE36[(n % 36) as usize]);
    n /= 36;
  }
  digits.iter().rev().map(|&b| char::from(b)).collect()
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn empty_string_hashes_to_zero() {
    assert_eq!(identity_hash(""), "0");
  }

  #[test]
  fn base36_renders_every_digit() {
    assert_eq!(to_base36(35), "z");
    assert_eq!(to_base36(36), "10");
    // |i32::MIN|, the largest magnitude the hash can produce.
    assert_eq!(to_base36(1 << 31), "zik0zk");
    assert_eq!(to_base36(u32::MAX), "1z141z3");
  }

  #[test]
  fn known_values() {
    // 'a' = 97 = 2*36 + 25
    assert_eq!(identity_hash("a"), "2p");
    // 97*31 + 98 = 3105
    assert_eq!(identity_hash("ab"), "2e9");
  }

  #[test]
  fn order_sensitive() {
    assert_ne!(identity_hash("ab"), identity_hash("ba"));
  }

  #[test]
  fn wraps_instead_of_overflowing() {
    let long = "the quick brown fox jumps over the lazy dog ".repeat(50);
    let h = identity_hash(&long);
    assert!(!h.is_empty());
    assert!(h.len() <= 7, "{h}");
    assert!(h.bytes().all(|b| b.is_ascii_alphanumeric()));
    assert_eq!(h, identity_hash(&long));
  }

  #[test]
  fn song_hash_is_case_folded() {
    assert_eq!(
      song_hash("Daft Punk", "One More Time", Some("Discovery")),
      song_hash("DAFT PUNK", "one more time", Some("discovery")),
    );
  }

  #[test]
  fn missing_album_is_empty_album() {
    assert_eq!(song_hash("A", "T", None), song_hash("A", "T", Some("")));
    assert_eq!(song_hash("A", "T", None), identity_hash("a_t_"));
  }

  #[test]
  fn album_changes_the_key() {
    assert_ne!(song_hash("A", "T", None), song_hash("A", "T", Some("X")));
  }

  #[test]
  fn value_variant_matches_typed() {
    let h = song_hash_value(&json!("A"), &json!("T"), Some(&json!(null))).unwrap();
    assert_eq!(h, song_hash("A", "T", None));
  }

  #[test]
  fn value_variant_rejects_non_strings() {
    let err = song_hash_value(&json!(42), &json!("T"), None).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));

    let err = song_hash_value(&json!("A"), &json!("T"), Some(&json!(["x"]))).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
  }
}
