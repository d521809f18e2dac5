//! Core types and trait definitions for the COVID case store.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the domain model, the storage traits, the incremental import engine and
//! the bounded stream that query results travel through.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod case;
pub mod country;
pub mod error;
pub mod import;
pub mod lookup;
pub mod source;
pub mod store;
pub mod stream;

pub use error::{ImportError, ValidationError};
