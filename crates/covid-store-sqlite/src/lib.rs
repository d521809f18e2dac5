//! SQLite backend for the COVID case store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on dedicated threads
//! without blocking the async runtime. Query results are streamed from a
//! per-query reader connection through a bounded channel.

mod cache;
mod encode;
mod query;
mod resolver;
mod schema;
mod store;

pub mod error;

pub use cache::CountryCache;
pub use error::{Error, Result};
pub use store::SqliteStore;
