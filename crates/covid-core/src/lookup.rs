//! Country lookup keys and the shape-based inference that picks an index.
//!
//! The rules are part of the public contract so callers can predict which
//! column a free-form country string is matched against:
//!
//! | Input shape                                       | Kind              |
//! |---------------------------------------------------|-------------------|
//! | exactly 2 characters, unchanged by upper-casing   | [`LookupKind::GeoId`] |
//! | exactly 3 characters, unchanged by upper-casing   | [`LookupKind::Code`]  |
//! | anything else                                     | [`LookupKind::Name`]  |
//!
//! Characters are counted as Unicode scalar values. Characters without case
//! (digits, punctuation) are unchanged by upper-casing, so `"12"` is a geo
//! identifier lookup. Name lookups match case-insensitively.

use std::{convert::Infallible, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// Which country column a lookup is matched against.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LookupKind {
  GeoId,
  Code,
  Name,
}

/// A country lookup: the column to match and the value to match it with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LookupKey {
  pub kind:  LookupKind,
  pub value: String,
}

impl LookupKey {
  pub fn new(kind: LookupKind, value: impl Into<String>) -> Self {
    Self { kind, value: value.into() }
  }

  /// Infer the lookup kind from the shape of `query`.
  pub fn infer(query: &str) -> Self {
    let upper = query.to_uppercase() == query;
    let kind = match query.chars().count() {
      2 if upper => LookupKind::GeoId,
      3 if upper => LookupKind::Code,
      _ => LookupKind::Name,
    };
    Self::new(kind, query)
  }
}

impl FromStr for LookupKey {
  type Err = Infallible;

  fn from_str(s: &str) -> Result<Self, Self::Err> { Ok(Self::infer(s)) }
}

impl fmt::Display for LookupKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}={}", self.kind, self.value)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn two_upper_chars_is_geo_id() {
    assert_eq!(LookupKey::infer("US").kind, LookupKind::GeoId);
  }

  #[test]
  fn three_upper_chars_is_code() {
    assert_eq!(LookupKey::infer("USA").kind, LookupKind::Code);
  }

  #[test]
  fn anything_else_is_name() {
    assert_eq!(LookupKey::infer("United States").kind, LookupKind::Name);
    assert_eq!(LookupKey::infer("us").kind, LookupKind::Name);
    assert_eq!(LookupKey::infer("Usa").kind, LookupKind::Name);
    assert_eq!(LookupKey::infer("USAX").kind, LookupKind::Name);
    assert_eq!(LookupKey::infer("").kind, LookupKind::Name);
  }

  #[test]
  fn caseless_characters_count_as_upper() {
    assert_eq!(LookupKey::infer("12").kind, LookupKind::GeoId);
    assert_eq!(LookupKey::infer("UK1").kind, LookupKind::Code);
  }

  #[test]
  fn length_is_measured_in_characters() {
    assert_eq!(LookupKey::infer("ÅÄ").kind, LookupKind::GeoId);
  }

  #[test]
  fn kind_display_is_snake_case() {
    assert_eq!(LookupKind::GeoId.to_string(), "geo_id");
    assert_eq!(LookupKey::infer("DEU").to_string(), "code=DEU");
  }
}
