//! The streaming query engine.
//!
//! A query runs as a producer on the database thread: it steps the result
//! cursor and hands each decoded row to the caller through a bounded
//! [`CaseSink`]. The caller consumes the matching [`CaseStream`] at its own
//! pace; a full buffer blocks the producer.
//!
//! The cursor lives on the producer's stack frame. When the consumer drops or
//! closes its stream, the next send fails, the producer returns, and the
//! statement is finalised as the frame unwinds.
//!
//! Each stream reads through a connection of its own, opened for the query
//! and closed when the producer returns. The store's connection stays free,
//! so a consumer may await other store calls between items. Stores adopted
//! over a connection that cannot be reopened are the exception: their streams
//! run on that connection (see [`SqliteStore::with_connection`]).

use chrono::NaiveDate;
use covid_core::{
  case::CaseRecord,
  lookup::{LookupKey, LookupKind},
  stream::{self, CaseSink, CaseStream},
};
use tokio::sync::oneshot;

use crate::{
  CountryCache, Error, Result, SqliteStore,
  encode::{RawCase, encode_date},
};

/// Column a lookup kind matches against. `countries.name` is declared
/// `COLLATE NOCASE`, so name lookups are case-insensitive.
fn lookup_column(kind: LookupKind) -> &'static str {
  match kind {
    LookupKind::GeoId => "k.geo_id",
    LookupKind::Code => "k.code",
    LookupKind::Name => "k.name",
  }
}

fn query_sql(kind: LookupKind) -> String {
  format!(
    "SELECT c.date, c.country_id, c.cases, c.deaths, c.cumulative
     FROM cases c
     INNER JOIN countries k ON k.id = c.country_id
     WHERE {} = ?1 AND c.date >= ?2
     ORDER BY c.date ASC, c.country_id ASC",
    lookup_column(kind)
  )
}

impl SqliteStore {
  pub(crate) async fn stream_cases(
    &self,
    key: LookupKey,
    since: NaiveDate,
  ) -> Result<CaseStream<Error>> {
    tracing::debug!(lookup = %key, %since, "streaming cases");

    let (sink, cases) = stream::channel(self.stream_capacity);
    let (ready_tx, ready_rx) = oneshot::channel();
    let sql = query_sql(key.kind);
    let since = encode_date(since);
    let cache = self.countries.clone();
    let conn = match self.location.open_reader().await? {
      Some(reader) => reader,
      None => self.conn.clone(),
    };

    let producer = tokio::spawn(async move {
      conn
        .call(move |conn| {
          produce(conn, &sql, &key.value, since, &cache, ready_tx, &sink);
          Ok(())
        })
        .await
    });

    // The producer reports whether the cursor opened before streaming rows,
    // so setup failures surface here rather than on the stream.
    match ready_rx.await {
      Ok(Ok(())) => Ok(cases),
      Ok(Err(e)) => Err(e),
      Err(_) => match producer.await {
        Ok(Err(e)) => Err(Error::Database(e)),
        _ => Err(Error::Database(tokio_rusqlite::Error::ConnectionClosed)),
      },
    }
  }
}

/// Step the cursor for one query, forwarding each row to `sink`.
///
/// Stops at exhaustion, at the first row-level error (which is forwarded as
/// the terminal item), or as soon as the consumer goes away.
fn produce(
  conn: &rusqlite::Connection,
  sql: &str,
  value: &str,
  since: i64,
  cache: &CountryCache,
  ready: oneshot::Sender<Result<()>>,
  sink: &CaseSink<Error>,
) {
  let mut stmt = match conn.prepare(sql) {
    Ok(stmt) => stmt,
    Err(e) => {
      let _ = ready.send(Err(e.into()));
      return;
    }
  };
  let mut rows = match stmt.query(rusqlite::params![value, since]) {
    Ok(rows) => rows,
    Err(e) => {
      let _ = ready.send(Err(e.into()));
      return;
    }
  };
  if ready.send(Ok(())).is_err() {
    return;
  }

  let mut sent = 0usize;
  loop {
    let item = match rows.next() {
      Ok(None) => break,
      Ok(Some(row)) => resolve_row(conn, cache, row),
      Err(e) => Err(e.into()),
    };
    let failed = item.is_err();
    if !sink.send(item) {
      tracing::debug!(sent, "case stream dropped by consumer");
      return;
    }
    if failed {
      return;
    }
    sent += 1;
  }
  tracing::debug!(sent, "case stream exhausted");
}

fn resolve_row(
  conn: &rusqlite::Connection,
  cache: &CountryCache,
  row: &rusqlite::Row<'_>,
) -> Result<CaseRecord> {
  let fact = RawCase::from_row(row)?.into_fact()?;
  let country = cache
    .get_or_load(conn, fact.country_id)?
    .ok_or(Error::CountryNotFound(fact.country_id))?;
  Ok(CaseRecord { fact, country })
}
