//! The incremental import engine.
//!
//! An import takes one batch of source records and writes only the facts the
//! store does not already know about, in a single atomic batch:
//!
//! 1. Every record's date parts and cumulative incidence are validated up
//!    front; one bad record aborts the call before anything is written.
//! 2. Each record is checked against what is already stored for its country
//!    code (see [`ImportPolicy`]). Store lookups are memoised per code for the
//!    duration of the call.
//! 3. Surviving records resolve their country through the
//!    [`CountryResolver`], which may append a new country version.
//! 4. All staged facts are inserted as one all-or-nothing batch.
//!
//! Country versions minted in step 3 are committed independently of the
//! batch in step 4. If the batch is rolled back those versions remain: the
//! dimension history records metadata changes whether or not the facts that
//! revealed them were stored.

use std::collections::{BTreeSet, HashMap, hash_map::Entry};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{
  case::CaseFact,
  error::{ImportError, ValidationError},
  source::SourceRecord,
  store::CountryResolver,
};

/// How the importer decides whether a record is already stored.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ImportPolicy {
  /// Import a record only if its date is strictly after the latest date
  /// stored for its code. A backfilled date older than that watermark is
  /// skipped even if it was never stored.
  #[default]
  Watermark,
  /// Import a record unless its exact date is already stored for its code.
  /// Duplicate dates within one batch are staged once.
  KnownDates,
}

/// Counters describing one import call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
  /// Records in the source batch.
  pub examined:            usize,
  /// Records already present in the store.
  pub skipped:             usize,
  /// Facts written.
  pub imported:            usize,
  /// New country version rows written.
  pub countries_versioned: usize,
}

/// Import `records` into `store`, writing only facts not already present.
pub async fn import<S>(
  store: &S,
  records: &[SourceRecord],
  policy: ImportPolicy,
) -> Result<ImportSummary, ImportError<S::Error>>
where
  S: CountryResolver,
{
  let validated = validate(records)?;
  Importer::new(store, policy).run(records, validated).await
}

/// A record that passed validation.
struct Validated {
  date:       NaiveDate,
  cumulative: f64,
}

fn validate(records: &[SourceRecord]) -> Result<Vec<Validated>, ValidationError> {
  records
    .iter()
    .enumerate()
    .map(|(index, record)| {
      let date = record.date().map_err(|e| e.at(index))?;
      let cumulative = record.cumulative().map_err(|e| e.at(index))?;
      Ok(Validated { date, cumulative })
    })
    .collect()
}

struct Importer<'a, S> {
  store:      &'a S,
  policy:     ImportPolicy,
  watermarks: HashMap<String, NaiveDate>,
  known:      HashMap<String, BTreeSet<NaiveDate>>,
}

impl<'a, S> Importer<'a, S>
where
  S: CountryResolver,
{
  fn new(store: &'a S, policy: ImportPolicy) -> Self {
    Self { store, policy, watermarks: HashMap::new(), known: HashMap::new() }
  }

  async fn run(
    mut self,
    records: &[SourceRecord],
    validated: Vec<Validated>,
  ) -> Result<ImportSummary, ImportError<S::Error>> {
    let mut summary = ImportSummary { examined: records.len(), ..Default::default() };
    let mut staged = Vec::new();

    for (record, checked) in records.iter().zip(validated) {
      if !self.is_new(&record.country_code, checked.date).await? {
        summary.skipped += 1;
        continue;
      }

      let resolution = self
        .store
        .resolve_or_version(record.attributes())
        .await
        .map_err(ImportError::Store)?;
      if resolution.created {
        summary.countries_versioned += 1;
      }

      staged.push(CaseFact {
        date:       checked.date,
        country_id: resolution.country.id,
        cases:      record.cases,
        deaths:     record.deaths,
        cumulative: checked.cumulative,
      });
    }

    if !staged.is_empty() {
      let staged_len = staged.len();
      summary.imported =
        self.store.insert_facts_batch(staged).await.map_err(|e| {
          tracing::warn!(staged = staged_len, error = %e, "import batch aborted");
          ImportError::Aborted(e)
        })?;
    }

    tracing::info!(
      policy = %self.policy,
      examined = summary.examined,
      skipped = summary.skipped,
      imported = summary.imported,
      countries_versioned = summary.countries_versioned,
      "import finished"
    );
    Ok(summary)
  }

  /// Whether a record for `code` on `date` should be staged.
  async fn is_new(
    &mut self,
    code: &str,
    date: NaiveDate,
  ) -> Result<bool, ImportError<S::Error>> {
    match self.policy {
      ImportPolicy::Watermark => {
        let watermark = match self.watermarks.entry(code.to_owned()) {
          Entry::Occupied(e) => *e.get(),
          Entry::Vacant(e) => {
            let last =
              self.store.last_fact_date(code).await.map_err(ImportError::Store)?;
            tracing::debug!(code, watermark = %last, "loaded watermark");
            *e.insert(last)
          }
        };
        Ok(date > watermark)
      }
      ImportPolicy::KnownDates => {
        let known = match self.known.entry(code.to_owned()) {
          Entry::Occupied(e) => e.into_mut(),
          Entry::Vacant(e) => {
            let dates =
              self.store.known_fact_dates(code).await.map_err(ImportError::Store)?;
            tracing::debug!(code, known = dates.len(), "loaded known dates");
            e.insert(dates)
          }
        };
        Ok(known.insert(date))
      }
    }
  }
}
