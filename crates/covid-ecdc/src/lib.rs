//! Fetcher for the ECDC COVID-19 case distribution feed.
//!
//! The feed is a single JSON document, `{"records": [...]}`, listing one
//! record per country per day (newest first). This crate only decodes it;
//! validation and import live in `covid-core`.

pub mod error;

use std::{io::Read, time::Duration};

use covid_core::source::SourceBatch;
use reqwest::Client;

pub use error::{Error, Result};

/// Where the feed is published.
pub const DEFAULT_URL: &str =
  "https://opendata.ecdc.europa.eu/covid19/casedistribution/json/";

/// Decode a feed document from `reader`.
pub fn load_records(reader: impl Read) -> Result<SourceBatch> {
  Ok(serde_json::from_reader(reader)?)
}

/// HTTP client for the feed.
///
/// Cheap to clone: the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct EcdcClient {
  client: Client,
}

impl EcdcClient {
  pub fn new() -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(60))
      .build()?;
    Ok(Self { client })
  }

  /// `GET url` and decode the body as a feed document.
  pub async fn fetch_records(&self, url: &str) -> Result<SourceBatch> {
    tracing::info!(url, "fetching case distribution");
    let resp = self.client.get(url).send().await?;

    let status = resp.status();
    if !status.is_success() {
      return Err(Error::Status(status.as_u16()));
    }

    let body = resp.bytes().await?;
    let batch = load_records(body.as_ref())?;
    tracing::info!(records = batch.records.len(), "fetched case distribution");
    Ok(batch)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn load_feed_document() {
    let json = br#"{"records": [
      {
        "dateRep": "02/01/2021", "day": "02", "month": "01", "year": "2021",
        "cases": 20, "deaths": 2,
        "countriesAndTerritories": "Germany", "geoId": "DE",
        "countryterritoryCode": "DEU", "popData2019": 83019213,
        "continentExp": "Europe",
        "Cumulative_number_for_14_days_of_COVID-19_cases_per_100000": "5.5"
      },
      {
        "dateRep": "01/01/2021", "day": "01", "month": "01", "year": "2021",
        "cases": 10, "deaths": 1,
        "countriesAndTerritories": "Germany", "geoId": "DE",
        "countryterritoryCode": "DEU", "popData2019": 83019213,
        "continentExp": "Europe",
        "Cumulative_number_for_14_days_of_COVID-19_cases_per_100000": ""
      }
    ]}"#;

    let batch = load_records(&json[..]).unwrap();
    assert_eq!(batch.records.len(), 2);
    assert_eq!(batch.records[0].cases, 20);
    assert_eq!(batch.records[1].cumulative().unwrap(), 0.0);
  }

  #[test]
  fn malformed_document_is_an_error() {
    let err = load_records(&br#"{"records": 7}"#[..]).unwrap_err();
    assert!(matches!(err, Error::Json(_)));
  }
}
