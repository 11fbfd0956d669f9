//! Core types and trait definitions for the Airwave rating service.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::RatingStore`] and drive the shared
//! transaction steps in [`tx`]; the API layer depends only on the trait.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod hash;
pub mod rating;
pub mod schema;
pub mod store;
pub mod tx;

pub use error::{Error, Result};
