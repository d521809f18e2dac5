//! The storage traits implemented by backends (e.g. `covid-store-sqlite`).
//!
//! [`CaseStore`] owns the physical schema and its atomic primitives.
//! [`CountryResolver`] versions country dimension rows and caches point
//! lookups. Higher layers (the importer, the CLI) depend on these
//! abstractions, not on any concrete backend.

use std::{collections::BTreeSet, future::Future, sync::Arc};

use chrono::NaiveDate;

use crate::{
  case::{CaseFact, epoch},
  country::{Country, CountryAttributes},
  lookup::LookupKey,
  stream::CaseStream,
};

// ─── Entity store ────────────────────────────────────────────────────────────

/// Abstraction over the durable country and case tables.
///
/// Country rows and case facts are both append-only: nothing is updated or
/// deleted once written.
pub trait CaseStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Create the tables if absent. Idempotent; safe on every startup.
  fn initialize(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Countries ─────────────────────────────────────────────────────────

  /// The highest-id version stored for `code`, if any.
  fn current_country_version<'a>(
    &'a self,
    code: &'a str,
  ) -> impl Future<Output = Result<Option<Country>, Self::Error>> + Send + 'a;

  /// Uncached point lookup of a country version by surrogate id.
  fn country_by_version_id(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Country>, Self::Error>> + Send + '_;

  /// Append a new country version and return its assigned id.
  fn insert_country_version(
    &self,
    attrs: CountryAttributes,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;

  /// Every stored version of `code`, oldest first.
  fn country_versions<'a>(
    &'a self,
    code: &'a str,
  ) -> impl Future<Output = Result<Vec<Country>, Self::Error>> + Send + 'a;

  // ── Facts ─────────────────────────────────────────────────────────────

  /// Insert all of `facts` in one transaction, or none of them.
  ///
  /// A `(date, country_id)` collision fails the whole batch with a conflict
  /// error; any other fault fails it with an aborted-batch error. Returns the
  /// number of rows written.
  fn insert_facts_batch(
    &self,
    facts: Vec<CaseFact>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// The latest fact date stored for `code` across all of its versions, or
  /// [`epoch`] if there is none.
  fn last_fact_date<'a>(
    &'a self,
    code: &'a str,
  ) -> impl Future<Output = Result<NaiveDate, Self::Error>> + Send + 'a;

  /// Every fact date stored for `code` across all of its versions.
  fn known_fact_dates<'a>(
    &'a self,
    code: &'a str,
  ) -> impl Future<Output = Result<BTreeSet<NaiveDate>, Self::Error>> + Send + 'a;

  /// Total number of stored facts.
  fn fact_count(&self) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Queries ───────────────────────────────────────────────────────────

  /// Stream the facts matching `key` dated on or after `since`, in ascending
  /// date order, each paired with the country version it references.
  ///
  /// Row-level failures arrive as a terminal `Err` item on the stream.
  fn query_facts_since(
    &self,
    key: LookupKey,
    since: NaiveDate,
  ) -> impl Future<Output = Result<CaseStream<Self::Error>, Self::Error>> + Send + '_;

  /// [`CaseStore::query_facts_since`] with an optional lower bound.
  fn query(
    &self,
    key: LookupKey,
    since: Option<NaiveDate>,
  ) -> impl Future<Output = Result<CaseStream<Self::Error>, Self::Error>> + Send + '_ {
    self.query_facts_since(key, since.unwrap_or_else(epoch))
  }

  /// The full history for `key`.
  fn query_latest(
    &self,
    key: LookupKey,
  ) -> impl Future<Output = Result<CaseStream<Self::Error>, Self::Error>> + Send + '_ {
    self.query_facts_since(key, epoch())
  }
}

// ─── Country resolver ────────────────────────────────────────────────────────

/// Type-2 slowly-changing-dimension semantics over country rows, plus a
/// process-wide cache of versions by id.
///
/// Cache entries are never evicted: a stored country version is immutable,
/// so a cached entry can never go stale.
pub trait CountryResolver: CaseStore {
  /// Return the current version of `attrs.code` if its mutable attributes
  /// match `attrs`; otherwise append a new version and return that.
  fn resolve_or_version(
    &self,
    attrs: CountryAttributes,
  ) -> impl Future<Output = Result<Resolution, Self::Error>> + Send + '_;

  /// Cached lookup of a country version by surrogate id.
  fn by_id(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Arc<Country>>, Self::Error>> + Send + '_;
}

/// Outcome of [`CountryResolver::resolve_or_version`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
  pub country: Arc<Country>,
  /// Whether a new version row was written.
  pub created: bool,
}
