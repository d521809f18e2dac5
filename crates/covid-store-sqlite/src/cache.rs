//! The process-wide cache of country versions by surrogate id.

use std::{
  collections::HashMap,
  sync::{Arc, PoisonError, RwLock},
};

use covid_core::country::Country;
use rusqlite::OptionalExtension as _;

use crate::{encode::country_from_row, schema::COUNTRY_COLUMNS};

/// Country versions keyed by id, shared by the import and query paths.
///
/// Entries are never evicted or invalidated. Stored country versions are
/// immutable, so an entry stays correct for the life of the process.
///
/// Cloning is cheap; clones share the same map.
#[derive(Clone, Default)]
pub struct CountryCache {
  inner: Arc<RwLock<HashMap<i64, Arc<Country>>>>,
}

impl CountryCache {
  pub fn new() -> Self { Self::default() }

  pub fn get(&self, id: i64) -> Option<Arc<Country>> {
    self.inner.read().unwrap_or_else(PoisonError::into_inner).get(&id).cloned()
  }

  /// Insert `country`, returning the shared handle now held by the cache.
  /// If the id is already cached the existing entry wins.
  pub fn insert(&self, country: Country) -> Arc<Country> {
    let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
    map.entry(country.id).or_insert_with(|| Arc::new(country)).clone()
  }

  pub fn len(&self) -> usize {
    self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }

  /// Read-through lookup on the database thread.
  pub(crate) fn get_or_load(
    &self,
    conn: &rusqlite::Connection,
    id: i64,
  ) -> rusqlite::Result<Option<Arc<Country>>> {
    if let Some(hit) = self.get(id) {
      return Ok(Some(hit));
    }
    let loaded = conn
      .prepare_cached(&format!("SELECT {COUNTRY_COLUMNS} FROM countries WHERE id = ?1"))?
      .query_row([id], country_from_row)
      .optional()?;
    Ok(loaded.map(|country| self.insert(country)))
  }
}
