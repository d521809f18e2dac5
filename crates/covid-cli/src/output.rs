//! Plain-text rendering of query results and import summaries.

use std::io::{self, Write};

use covid_core::{case::CaseRecord, country::Country, import::ImportSummary};

pub fn write_header(out: &mut impl Write) -> io::Result<()> {
  writeln!(
    out,
    "{:<15} {:<15} {:<15} {:<10} {}",
    "Country", "Date", "Cumulative", "New cases", "New deaths"
  )
}

pub fn write_row(out: &mut impl Write, record: &CaseRecord) -> io::Result<()> {
  writeln!(
    out,
    "{:<15} {:<15} {:<15.6} {:<10} {}",
    record.country.name,
    record.fact.date.format("%Y-%m-%d").to_string(),
    record.fact.cumulative,
    record.fact.cases,
    record.fact.deaths,
  )
}

pub fn write_summary(out: &mut impl Write, summary: &ImportSummary) -> io::Result<()> {
  writeln!(
    out,
    "Examined {} records: imported {}, skipped {}, {} new country versions",
    summary.examined, summary.imported, summary.skipped, summary.countries_versioned,
  )
}

pub fn write_country(out: &mut impl Write, country: &Country) -> io::Result<()> {
  let population = country
    .population
    .map_or_else(|| "-".to_owned(), |p| p.to_string());
  writeln!(
    out,
    "{:<6} {:<4} {:<4} {:<30} {:<12} {}",
    country.id, country.code, country.geo_id, country.name, population, country.continent,
  )
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use chrono::NaiveDate;
  use covid_core::case::CaseFact;

  use super::*;

  #[test]
  fn row_layout() {
    let record = CaseRecord {
      fact:    CaseFact {
        date:       NaiveDate::from_ymd_opt(2021, 1, 2).unwrap(),
        country_id: 1,
        cases:      20,
        deaths:     2,
        cumulative: 5.5,
      },
      country: Arc::new(Country {
        id:         1,
        code:       "DEU".into(),
        geo_id:     "DE".into(),
        name:       "Germany".into(),
        population: None,
        continent:  "Europe".into(),
      }),
    };

    let mut buf = Vec::new();
    write_row(&mut buf, &record).unwrap();
    assert_eq!(
      String::from_utf8(buf).unwrap(),
      "Germany         2021-01-02      5.500000        20         2\n"
    );
  }

  #[test]
  fn summary_line() {
    let summary = ImportSummary { examined: 4, skipped: 3, imported: 1, countries_versioned: 0 };
    let mut buf = Vec::new();
    write_summary(&mut buf, &summary).unwrap();
    assert_eq!(
      String::from_utf8(buf).unwrap(),
      "Examined 4 records: imported 1, skipped 3, 0 new country versions\n"
    );
  }
}
