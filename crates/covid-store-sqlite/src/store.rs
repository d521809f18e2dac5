//! [`SqliteStore`]: the SQLite implementation of [`CaseStore`].

use std::{
  collections::BTreeSet,
  path::{Path, PathBuf},
  sync::atomic::{AtomicU64, Ordering},
};

use chrono::NaiveDate;
use covid_core::{
  case::{CaseFact, epoch},
  country::{Country, CountryAttributes},
  lookup::LookupKey,
  store::CaseStore,
  stream::{CaseStream, DEFAULT_CAPACITY},
};
use rusqlite::OptionalExtension as _;

use crate::{
  CountryCache, Error, Result,
  encode::{country_from_row, decode_date, encode_date},
  schema::{COUNTRY_COLUMNS, INSERT_CASE, INSERT_COUNTRY, PROBES, SCHEMA},
};

// ─── Location ────────────────────────────────────────────────────────────────

/// Where the database lives. Query streams open their own connection here so
/// the store's connection stays free while a stream is being consumed.
#[derive(Clone, Debug)]
pub(crate) enum Location {
  File(PathBuf),
  /// A named shared-cache in-memory database.
  Memory(String),
  /// A connection handed to [`SqliteStore::with_connection`] whose database
  /// cannot be reopened; streams run on that connection.
  Adopted,
}

static MEMORY_DATABASES: AtomicU64 = AtomicU64::new(0);

impl Location {
  fn memory() -> Self {
    let n = MEMORY_DATABASES.fetch_add(1, Ordering::Relaxed);
    Self::Memory(format!(
      "file:covid-{}-{n}?mode=memory&cache=shared",
      std::process::id()
    ))
  }

  async fn connect(&self) -> Result<Option<tokio_rusqlite::Connection>> {
    let conn = match self {
      Self::File(path) => tokio_rusqlite::Connection::open(path).await?,
      Self::Memory(uri) => tokio_rusqlite::Connection::open(uri).await?,
      Self::Adopted => return Ok(None),
    };
    Ok(Some(conn))
  }

  /// Open a read-only connection for one query stream, or `None` when the
  /// database can only be reached through the store's own connection.
  pub(crate) async fn open_reader(&self) -> Result<Option<tokio_rusqlite::Connection>> {
    let Some(conn) = self.connect().await? else {
      return Ok(None);
    };
    let shared_cache = matches!(self, Self::Memory(_));
    conn
      .call(move |conn| {
        conn.pragma_update(None, "query_only", true)?;
        // Shared-cache readers otherwise take table locks, and writers on the
        // main connection fail with SQLITE_LOCKED instead of waiting.
        if shared_cache {
          conn.pragma_update(None, "read_uncommitted", true)?;
        }
        Ok(())
      })
      .await?;
    Ok(Some(conn))
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A COVID case store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection and the country cache are both
/// reference-counted, and clones share them. Each query stream reads through
/// a connection of its own.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn:            tokio_rusqlite::Connection,
  pub(crate) location:        Location,
  pub(crate) countries:       CountryCache,
  pub(crate) stream_capacity: usize,
}

/// Result of a batch insert, decided on the database thread.
enum BatchOutcome {
  Committed(usize),
  Conflict { date: i64, country_id: i64 },
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let location = Location::File(path.as_ref().to_path_buf());
    Self::open_location(location).await
  }

  /// Open an in-memory store: useful for testing. The database lives as long
  /// as the store or one of its streams holds a connection to it.
  pub async fn open_in_memory() -> Result<Self> {
    Self::open_location(Location::memory()).await
  }

  /// Adopt an already-open connection and run schema initialisation.
  ///
  /// If the connection is to a database file, query streams open their own
  /// connections to it. Otherwise streams run on `conn` itself, and other
  /// calls on the store wait until the open stream is exhausted or dropped.
  pub async fn with_connection(conn: tokio_rusqlite::Connection) -> Result<Self> {
    let path = conn
      .call(|conn| Ok(conn.path().map(PathBuf::from)))
      .await?;
    let location = match path {
      Some(path) if !path.as_os_str().is_empty() => Location::File(path),
      _ => Location::Adopted,
    };
    Self::initialize_with(conn, location).await
  }

  async fn open_location(location: Location) -> Result<Self> {
    let conn = location
      .connect()
      .await?
      .ok_or(Error::Database(tokio_rusqlite::Error::ConnectionClosed))?;
    Self::initialize_with(conn, location).await
  }

  async fn initialize_with(conn: tokio_rusqlite::Connection, location: Location) -> Result<Self> {
    let store = Self {
      conn,
      location,
      countries: CountryCache::new(),
      stream_capacity: DEFAULT_CAPACITY,
    };
    store.initialize().await?;
    Ok(store)
  }

  /// Number of results buffered ahead of a query consumer.
  pub fn with_stream_capacity(mut self, capacity: usize) -> Self {
    self.stream_capacity = capacity.max(1);
    self
  }

  /// The country cache shared by this store and its clones.
  pub fn country_cache(&self) -> &CountryCache { &self.countries }
}

// ─── CaseStore impl ──────────────────────────────────────────────────────────

impl CaseStore for SqliteStore {
  type Error = Error;

  async fn initialize(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        for probe in PROBES {
          conn.prepare(probe)?;
        }
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Countries ─────────────────────────────────────────────────────────────

  async fn current_country_version(&self, code: &str) -> Result<Option<Country>> {
    let code = code.to_owned();
    let country = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .prepare_cached(&format!(
              "SELECT {COUNTRY_COLUMNS} FROM countries
               WHERE code = ?1 ORDER BY id DESC LIMIT 1"
            ))?
            .query_row([code], country_from_row)
            .optional()?,
        )
      })
      .await?;
    Ok(country)
  }

  async fn country_by_version_id(&self, id: i64) -> Result<Option<Country>> {
    let country = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .prepare_cached(&format!("SELECT {COUNTRY_COLUMNS} FROM countries WHERE id = ?1"))?
            .query_row([id], country_from_row)
            .optional()?,
        )
      })
      .await?;
    Ok(country)
  }

  async fn insert_country_version(&self, attrs: CountryAttributes) -> Result<i64> {
    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          INSERT_COUNTRY,
          rusqlite::params![
            attrs.code,
            attrs.geo_id,
            attrs.name,
            attrs.population,
            attrs.continent,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;
    Ok(id)
  }

  async fn country_versions(&self, code: &str) -> Result<Vec<Country>> {
    let code = code.to_owned();
    let versions = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(&format!(
          "SELECT {COUNTRY_COLUMNS} FROM countries WHERE code = ?1 ORDER BY id ASC"
        ))?;
        let rows = stmt
          .query_map([code], country_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(versions)
  }

  // ── Facts ─────────────────────────────────────────────────────────────────

  async fn insert_facts_batch(&self, facts: Vec<CaseFact>) -> Result<usize> {
    let rows: Vec<(i64, CaseFact)> =
      facts.into_iter().map(|f| (encode_date(f.date), f)).collect();

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare_cached(INSERT_CASE)?;
          for (date, fact) in &rows {
            let inserted = stmt.execute(rusqlite::params![
              date,
              fact.country_id,
              fact.cases,
              fact.deaths,
              fact.cumulative,
            ]);
            match inserted {
              Ok(_) => {}
              Err(rusqlite::Error::SqliteFailure(e, _))
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
              {
                // Dropping `tx` rolls the batch back.
                return Ok(BatchOutcome::Conflict {
                  date:       *date,
                  country_id: fact.country_id,
                });
              }
              Err(e) => return Err(e.into()),
            }
          }
        }
        tx.commit()?;
        Ok(BatchOutcome::Committed(rows.len()))
      })
      .await
      .map_err(Error::BatchAborted)?;

    match outcome {
      BatchOutcome::Committed(n) => {
        tracing::debug!(rows = n, "fact batch committed");
        Ok(n)
      }
      BatchOutcome::Conflict { date, country_id } => {
        Err(Error::Conflict { date: decode_date(date)?, country_id })
      }
    }
  }

  async fn last_fact_date(&self, code: &str) -> Result<NaiveDate> {
    let code = code.to_owned();
    let latest: Option<i64> = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT MAX(c.date)
           FROM cases c
           INNER JOIN countries k ON k.id = c.country_id
           WHERE k.code = ?1",
          [code],
          |row| row.get(0),
        )?)
      })
      .await?;
    latest.map_or_else(|| Ok(epoch()), decode_date)
  }

  async fn known_fact_dates(&self, code: &str) -> Result<BTreeSet<NaiveDate>> {
    let code = code.to_owned();
    let raw: Vec<i64> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(
          "SELECT DISTINCT c.date
           FROM cases c
           INNER JOIN countries k ON k.id = c.country_id
           WHERE k.code = ?1",
        )?;
        let rows = stmt
          .query_map([code], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raw.into_iter().map(decode_date).collect()
  }

  async fn fact_count(&self) -> Result<u64> {
    let count: i64 = self
      .conn
      .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM cases", [], |row| row.get(0))?))
      .await?;
    u64::try_from(count).map_err(|e| Error::Decode(e.to_string()))
  }

  // ── Queries ───────────────────────────────────────────────────────────────

  async fn query_facts_since(
    &self,
    key: LookupKey,
    since: NaiveDate,
  ) -> Result<CaseStream<Error>> {
    self.stream_cases(key, since).await
  }
}
