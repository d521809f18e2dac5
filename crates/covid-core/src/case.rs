//! Case facts: the append-only daily measurements.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::country::Country;

/// The sentinel watermark returned for a country with no stored facts.
///
/// Every date the importer can produce compares strictly after it.
pub fn epoch() -> NaiveDate { NaiveDate::default() }

/// One day of statistics for one country version.
///
/// `(date, country_id)` is unique in the store. `country_id` references the
/// country version that was current when the fact was imported, not merely
/// its code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseFact {
  /// Calendar day; any time-of-day component is discarded on ingest.
  pub date:       NaiveDate,
  pub country_id: i64,
  pub cases:      i64,
  pub deaths:     i64,
  /// 14-day cumulative incidence per 100 000 inhabitants.
  pub cumulative: f64,
}

/// A fact paired with the country version it references.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseRecord {
  pub fact:    CaseFact,
  pub country: Arc<Country>,
}
