//! Country: the versioned dimension that case facts point at.
//!
//! Country rows are never updated in place. When any mutable attribute of a
//! country changes, a new row with the same `code` and a higher `id` is
//! appended; the row with the highest `id` for a code is its current version.

use serde::{Deserialize, Serialize};

/// The attribute tuple describing a country, independent of any stored
/// version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryAttributes {
  /// ISO 3166-1 alpha-3 style code (e.g. `DEU`).
  pub code:       String,
  /// Two-letter geo identifier (e.g. `DE`).
  pub geo_id:     String,
  pub name:       String,
  pub population: Option<i64>,
  pub continent:  String,
}

/// One stored version of a country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
  /// Surrogate identifier assigned by the store; strictly increasing.
  pub id:         i64,
  pub code:       String,
  pub geo_id:     String,
  pub name:       String,
  pub population: Option<i64>,
  pub continent:  String,
}

impl Country {
  /// Build a stored version from its attributes and assigned id.
  pub fn from_attributes(id: i64, attrs: CountryAttributes) -> Self {
    Self {
      id,
      code: attrs.code,
      geo_id: attrs.geo_id,
      name: attrs.name,
      population: attrs.population,
      continent: attrs.continent,
    }
  }

  /// Whether the four mutable attributes (geo id, name, population,
  /// continent) equal `attrs`. The code is not compared.
  pub fn same_attributes(&self, attrs: &CountryAttributes) -> bool {
    self.geo_id == attrs.geo_id
      && self.name == attrs.name
      && self.population == attrs.population
      && self.continent == attrs.continent
  }
}
