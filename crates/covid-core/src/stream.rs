//! A bounded producer/consumer handoff for query results.
//!
//! The producer (a storage scan running on its own thread) pushes results
//! through a [`CaseSink`]; the consumer pulls them from a [`CaseStream`].
//! The channel is bounded, so a slow consumer blocks the producer.
//!
//! Cancellation is tied to scope: dropping the stream (or calling
//! [`CaseStream::close`]) makes the next [`CaseSink::send`] report that the
//! consumer is gone, and the producer unwinds and releases its cursor.
//!
//! After an `Err` item the stream is terminated: no further items are
//! yielded even if the producer misbehaves and sends more.

use tokio::sync::mpsc;

use crate::case::CaseRecord;

/// Number of results buffered between producer and consumer. With a
/// capacity of one, the producer holds at most one row ahead of the consumer.
pub const DEFAULT_CAPACITY: usize = 1;

/// Create a connected sink/stream pair holding at most `capacity` results.
pub fn channel<E>(capacity: usize) -> (CaseSink<E>, CaseStream<E>) {
  let (tx, rx) = mpsc::channel(capacity.max(1));
  (CaseSink { tx }, CaseStream { rx, done: false })
}

/// The producing half. Intended for use from a blocking (non-async) thread.
pub struct CaseSink<E> {
  tx: mpsc::Sender<Result<CaseRecord, E>>,
}

impl<E> CaseSink<E> {
  /// Hand one result to the consumer, blocking while the buffer is full.
  ///
  /// Returns `false` if the consumer has gone away; the producer must stop.
  pub fn send(&self, item: Result<CaseRecord, E>) -> bool {
    self.tx.blocking_send(item).is_ok()
  }

  #[cfg(test)]
  async fn send_async(&self, item: Result<CaseRecord, E>) -> bool {
    self.tx.send(item).await.is_ok()
  }
}

/// The consuming half; yields results in the order the producer sent them.
pub struct CaseStream<E> {
  rx:   mpsc::Receiver<Result<CaseRecord, E>>,
  done: bool,
}

impl<E> CaseStream<E> {
  /// Receive the next result. `None` marks the end of the stream, either
  /// after exhaustion or after a terminal error was yielded.
  pub async fn next(&mut self) -> Option<Result<CaseRecord, E>> {
    if self.done {
      return None;
    }
    let item = self.rx.recv().await;
    match &item {
      None | Some(Err(_)) => self.finish(),
      Some(Ok(_)) => {}
    }
    item
  }

  /// Stop consuming. The producer observes the closure on its next send.
  pub fn close(&mut self) { self.finish(); }

  /// Drain the remaining results, stopping at the first error.
  pub async fn try_collect(mut self) -> Result<Vec<CaseRecord>, E> {
    let mut out = Vec::new();
    while let Some(item) = self.next().await {
      out.push(item?);
    }
    Ok(out)
  }

  fn finish(&mut self) {
    self.done = true;
    self.rx.close();
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use chrono::NaiveDate;

  use super::*;
  use crate::{case::CaseFact, country::Country};

  fn record(day: u32) -> CaseRecord {
    CaseRecord {
      fact:    CaseFact {
        date:       NaiveDate::from_ymd_opt(2021, 1, day).unwrap(),
        country_id: 1,
        cases:      day as i64,
        deaths:     0,
        cumulative: 0.0,
      },
      country: Arc::new(Country {
        id:         1,
        code:       "DEU".into(),
        geo_id:     "DE".into(),
        name:       "Germany".into(),
        population: None,
        continent:  "Europe".into(),
      }),
    }
  }

  #[tokio::test]
  async fn yields_in_send_order() {
    let (sink, stream) = channel::<String>(DEFAULT_CAPACITY);
    let producer = std::thread::spawn(move || {
      for day in 1..=3 {
        assert!(sink.send(Ok(record(day))));
      }
    });
    let got = stream.try_collect().await.unwrap();
    producer.join().unwrap();
    let days: Vec<_> = got.iter().map(|r| r.fact.cases).collect();
    assert_eq!(days, vec![1, 2, 3]);
  }

  #[tokio::test]
  async fn error_terminates_stream() {
    let (sink, mut stream) = channel::<String>(4);
    assert!(sink.send_async(Ok(record(1))).await);
    assert!(sink.send_async(Err("boom".into())).await);

    assert!(stream.next().await.unwrap().is_ok());
    assert_eq!(stream.next().await.unwrap().unwrap_err(), "boom");
    assert!(stream.next().await.is_none());
    assert!(!sink.send_async(Ok(record(2))).await);
  }

  #[tokio::test]
  async fn dropping_stream_stops_producer() {
    let (sink, mut stream) = channel::<String>(DEFAULT_CAPACITY);
    let producer = std::thread::spawn(move || {
      let mut sent = 0;
      for day in 1..=20 {
        if !sink.send(Ok(record(day))) {
          break;
        }
        sent += 1;
      }
      sent
    });
    assert!(stream.next().await.unwrap().is_ok());
    drop(stream);
    let sent = producer.join().unwrap();
    assert!(sent < 20);
  }
}
