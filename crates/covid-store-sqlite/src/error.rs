//! Error type for `covid-store-sqlite`.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// A `(date, country_id)` pair in a batch is already stored. The batch was
  /// rolled back.
  #[error("a fact for country version {country_id} on {date} is already stored")]
  Conflict { date: NaiveDate, country_id: i64 },

  /// The batch insert failed for a reason other than a key conflict and was
  /// rolled back.
  #[error("batch insert aborted: {0}")]
  BatchAborted(#[source] tokio_rusqlite::Error),

  #[error("decode error: {0}")]
  Decode(String),

  #[error("country version not found: {0}")]
  CountryNotFound(i64),
}

impl Error {
  pub fn is_conflict(&self) -> bool { matches!(self, Self::Conflict { .. }) }
}

impl From<rusqlite::Error> for Error {
  fn from(e: rusqlite::Error) -> Self { Self::Database(e.into()) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
