//! Error types for `covid-core`.

use thiserror::Error;

/// A source record that cannot be turned into a case fact.
///
/// Any validation failure aborts the whole import before a single fact is
/// written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("record {index}: invalid {field} {value:?}")]
pub struct ValidationError {
  /// Position of the offending record in the source batch.
  pub index: usize,
  pub field: &'static str,
  pub value: String,
}

impl ValidationError {
  /// Re-anchor an error produced without batch context at `index`.
  pub fn at(mut self, index: usize) -> Self {
    self.index = index;
    self
  }
}

/// Failure of an import call, generic over the backend error type.
#[derive(Debug, Error)]
pub enum ImportError<E> {
  #[error(transparent)]
  Validation(#[from] ValidationError),

  /// A lookup or dimension write failed before the batch insert.
  #[error("store error: {0}")]
  Store(#[source] E),

  /// The batch insert failed and was rolled back; no facts were written.
  #[error("import aborted: {0}")]
  Aborted(#[source] E),
}
