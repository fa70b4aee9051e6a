//! Core types and the reconciliation engine for trawl.
//!
//! This crate is deliberately free of HTTP and database dependencies. Storage
//! backends implement [`store::ContentStore`]; post sources implement
//! [`fetch::Fetcher`]. Everything between the two (hashing, classification,
//! write planning, the per-topic run loop) lives here.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod content;
pub mod error;
pub mod fetch;
pub mod hash;
pub mod index;
pub mod persist;
pub mod post;
pub mod reconcile;
pub mod run;
pub mod store;

pub use error::{Error, Result};
