//! Externally-sourced records, as published in the ECDC case distribution
//! feed.
//!
//! Source records are loosely typed: date parts and the cumulative incidence
//! arrive as text. [`SourceRecord::date`] and [`SourceRecord::cumulative`]
//! validate them; the importer aborts the whole batch on the first failure.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{country::CountryAttributes, error::ValidationError};

/// The feed envelope: `{"records": [...]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceBatch {
  pub records: Vec<SourceRecord>,
}

/// One day of statistics for one country, as published.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
  /// Human-readable report date (`dd/mm/yyyy`); informational only.
  #[serde(rename = "dateRep", default)]
  pub date_rep:     String,
  #[serde(deserialize_with = "text_or_number")]
  pub day:          String,
  #[serde(deserialize_with = "text_or_number")]
  pub month:        String,
  #[serde(deserialize_with = "text_or_number")]
  pub year:         String,
  pub cases:        i64,
  pub deaths:       i64,
  #[serde(rename = "countriesAndTerritories")]
  pub country_name: String,
  #[serde(rename = "geoId")]
  pub geo_id:       String,
  #[serde(rename = "countryterritoryCode", default)]
  pub country_code: String,
  #[serde(rename = "popData2019", default)]
  pub population:   Option<i64>,
  #[serde(rename = "continentExp", default)]
  pub continent:    String,
  #[serde(
    rename = "Cumulative_number_for_14_days_of_COVID-19_cases_per_100000",
    default,
    deserialize_with = "optional_text_or_number"
  )]
  pub cumulative:   Option<String>,
}

impl SourceRecord {
  /// The calendar date described by the `day`, `month` and `year` parts.
  pub fn date(&self) -> Result<NaiveDate, ValidationError> {
    let day = parse_part("day", &self.day)?;
    let month = parse_part("month", &self.month)?;
    let year = parse_part("year", &self.year)?;
    i32::try_from(year)
      .ok()
      .and_then(|year| NaiveDate::from_ymd_opt(year, month, day))
      .ok_or_else(|| invalid(
        "date",
        format!("{}-{}-{}", self.year, self.month, self.day),
      ))
  }

  /// The 14-day cumulative incidence; an absent or empty value is `0.0`.
  pub fn cumulative(&self) -> Result<f64, ValidationError> {
    match self.cumulative.as_deref().map(str::trim) {
      None | Some("") => Ok(0.0),
      Some(text) => text
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or_else(|| invalid("cumulative", text)),
    }
  }

  /// The country attributes carried by this record.
  pub fn attributes(&self) -> CountryAttributes {
    CountryAttributes {
      code:       self.country_code.clone(),
      geo_id:     self.geo_id.clone(),
      name:       self.country_name.clone(),
      population: self.population,
      continent:  self.continent.clone(),
    }
  }
}

fn parse_part(field: &'static str, text: &str) -> Result<u32, ValidationError> {
  text
    .trim()
    .parse::<u32>()
    .ok()
    .filter(|v| *v > 0)
    .ok_or_else(|| invalid(field, text))
}

fn invalid(field: &'static str, value: impl Into<String>) -> ValidationError {
  ValidationError { index: 0, field, value: value.into() }
}

// ─── Serde helpers ───────────────────────────────────────────────────────────

/// Some mirrors of the feed publish numeric fields unquoted.
fn text_or_number<'de, D>(de: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  optional_text_or_number(de)?
    .ok_or_else(|| serde::de::Error::custom("expected a string or number"))
}

fn optional_text_or_number<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  match Option::<serde_json::Value>::deserialize(de)? {
    None | Some(serde_json::Value::Null) => Ok(None),
    Some(serde_json::Value::String(s)) => Ok(Some(s)),
    Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
    Some(other) => Err(serde::de::Error::custom(format!(
      "expected a string or number, found {other}"
    ))),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn record(day: &str, month: &str, year: &str) -> SourceRecord {
    SourceRecord {
      day: day.into(),
      month: month.into(),
      year: year.into(),
      ..Default::default()
    }
  }

  #[test]
  fn date_from_parts() {
    let date = record("3", "1", "2021").date().unwrap();
    assert_eq!(date, NaiveDate::from_ymd_opt(2021, 1, 3).unwrap());
  }

  #[test]
  fn zero_padded_parts_are_accepted() {
    let date = record("03", "01", "2021").date().unwrap();
    assert_eq!(date, NaiveDate::from_ymd_opt(2021, 1, 3).unwrap());
  }

  #[test]
  fn non_numeric_day_is_rejected() {
    let err = record("x", "1", "2021").date().unwrap_err();
    assert_eq!(err.field, "day");
    assert_eq!(err.value, "x");
  }

  #[test]
  fn impossible_date_is_rejected() {
    let err = record("31", "2", "2021").date().unwrap_err();
    assert_eq!(err.field, "date");
  }

  #[test]
  fn zero_month_is_rejected() {
    let err = record("1", "0", "2021").date().unwrap_err();
    assert_eq!(err.field, "month");
  }

  #[test]
  fn cumulative_defaults_to_zero() {
    let mut r = record("1", "1", "2021");
    assert_eq!(r.cumulative().unwrap(), 0.0);
    r.cumulative = Some(String::new());
    assert_eq!(r.cumulative().unwrap(), 0.0);
  }

  #[test]
  fn cumulative_parses_reals() {
    let mut r = record("1", "1", "2021");
    r.cumulative = Some("5.5".into());
    assert_eq!(r.cumulative().unwrap(), 5.5);
  }

  #[test]
  fn cumulative_rejects_text() {
    let mut r = record("1", "1", "2021");
    r.cumulative = Some("n/a".into());
    let err = r.cumulative().unwrap_err();
    assert_eq!(err.field, "cumulative");
  }

  #[test]
  fn deserializes_feed_record() {
    let json = r#"{
      "dateRep": "14/12/2020",
      "day": "14",
      "month": "12",
      "year": "2020",
      "cases": 16362,
      "deaths": 188,
      "countriesAndTerritories": "Germany",
      "geoId": "DE",
      "countryterritoryCode": "DEU",
      "popData2019": 83019213,
      "continentExp": "Europe",
      "Cumulative_number_for_14_days_of_COVID-19_cases_per_100000": "311.59"
    }"#;
    let r: SourceRecord = serde_json::from_str(json).unwrap();
    assert_eq!(r.country_code, "DEU");
    assert_eq!(r.population, Some(83_019_213));
    assert_eq!(r.date().unwrap(), NaiveDate::from_ymd_opt(2020, 12, 14).unwrap());
    assert_eq!(r.cumulative().unwrap(), 311.59);
  }

  #[test]
  fn deserializes_null_population_and_numeric_parts() {
    let json = r#"{
      "day": 1, "month": 3, "year": 2020,
      "cases": 0, "deaths": 0,
      "countriesAndTerritories": "Cases_on_an_international_conveyance_Japan",
      "geoId": "JPG11668",
      "countryterritoryCode": "",
      "popData2019": null,
      "continentExp": "Other",
      "Cumulative_number_for_14_days_of_COVID-19_cases_per_100000": null
    }"#;
    let r: SourceRecord = serde_json::from_str(json).unwrap();
    assert_eq!(r.population, None);
    assert_eq!(r.day, "1");
    assert_eq!(r.cumulative, None);
  }
}
