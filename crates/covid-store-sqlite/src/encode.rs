//! Encoding and decoding helpers between domain types and SQLite columns.
//!
//! Dates are stored as the Unix timestamp of local midnight on that calendar
//! day. Reading one back maps the instant to its local calendar date.

use chrono::{Duration, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use covid_core::{case::CaseFact, country::Country};

use crate::{Error, Result};

// ─── Dates ───────────────────────────────────────────────────────────────────

/// Seconds since the Unix epoch at local midnight of `date`.
///
/// When local midnight falls in a daylight-saving gap the first hour after
/// it is used instead, which still lies on the same local day.
pub fn encode_date(date: NaiveDate) -> i64 {
  let midnight = date.and_time(NaiveTime::MIN);
  Local
    .from_local_datetime(&midnight)
    .earliest()
    .or_else(|| Local.from_local_datetime(&(midnight + Duration::hours(1))).earliest())
    .map(|t| t.timestamp())
    .unwrap_or_else(|| Utc.from_utc_datetime(&midnight).timestamp())
}

pub fn decode_date(secs: i64) -> Result<NaiveDate> {
  Local
    .timestamp_opt(secs, 0)
    .earliest()
    .map(|t| t.date_naive())
    .ok_or_else(|| Error::Decode(format!("timestamp out of range: {secs}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Map a row selected with [`crate::schema::COUNTRY_COLUMNS`].
pub fn country_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Country> {
  Ok(Country {
    id:         row.get(0)?,
    code:       row.get(1)?,
    geo_id:     row.get(2)?,
    name:       row.get(3)?,
    population: row.get(4)?,
    continent:  row.get(5)?,
  })
}

/// Raw columns read directly from a `cases` row.
pub struct RawCase {
  pub date:       i64,
  pub country_id: i64,
  pub cases:      i64,
  pub deaths:     i64,
  pub cumulative: f64,
}

impl RawCase {
  /// Map a row selecting `date, country_id, cases, deaths, cumulative`.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      date:       row.get(0)?,
      country_id: row.get(1)?,
      cases:      row.get(2)?,
      deaths:     row.get(3)?,
      cumulative: row.get(4)?,
    })
  }

  pub fn into_fact(self) -> Result<CaseFact> {
    Ok(CaseFact {
      date:       decode_date(self.date)?,
      country_id: self.country_id,
      cases:      self.cases,
      deaths:     self.deaths,
      cumulative: self.cumulative,
    })
  }
}
