//! [`CountryResolver`] for [`SqliteStore`]: type-2 versioning of country rows
//! plus the read-through cache.

use std::sync::Arc;

use covid_core::{
  country::{Country, CountryAttributes},
  store::{CountryResolver, Resolution},
};
use rusqlite::{OptionalExtension as _, TransactionBehavior};

use crate::{
  Result, SqliteStore,
  encode::country_from_row,
  schema::{COUNTRY_COLUMNS, INSERT_COUNTRY},
};

impl CountryResolver for SqliteStore {
  async fn resolve_or_version(&self, attrs: CountryAttributes) -> Result<Resolution> {
    // Read the current version and append a new one under a single write
    // lock, so two writers cannot both append for the same change.
    let (country, created) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current = tx
          .prepare_cached(&format!(
            "SELECT {COUNTRY_COLUMNS} FROM countries
             WHERE code = ?1 ORDER BY id DESC LIMIT 1"
          ))?
          .query_row([&attrs.code], country_from_row)
          .optional()?;

        if let Some(current) = current
          && current.same_attributes(&attrs)
        {
          return Ok((current, false));
        }

        tx.execute(
          INSERT_COUNTRY,
          rusqlite::params![
            attrs.code,
            attrs.geo_id,
            attrs.name,
            attrs.population,
            attrs.continent,
          ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok((Country::from_attributes(id, attrs), true))
      })
      .await?;

    if created {
      tracing::debug!(code = %country.code, id = country.id, "new country version");
    }
    Ok(Resolution { country: self.countries.insert(country), created })
  }

  async fn by_id(&self, id: i64) -> Result<Option<Arc<Country>>> {
    if let Some(hit) = self.countries.get(id) {
      return Ok(Some(hit));
    }
    let cache = self.countries.clone();
    let country = self
      .conn
      .call(move |conn| Ok(cache.get_or_load(conn, id)?))
      .await?;
    Ok(country)
  }
}
