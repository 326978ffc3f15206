//! Push-based relay from an NDJSON stream into a sink.

use crate::error::{BoxError, StreamResult};
use crate::record::EmittedEvent;
use crate::sink::EventSink;
use crate::stream::{NdjsonStream, RelayStats};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How a relay ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Upstream reached end of stream and the final record was flushed.
    Completed(RelayStats),
    /// The token fired; the pending partial record was dropped.
    Cancelled(RelayStats),
}

impl RelayOutcome {
    /// Counters at the time the relay ended.
    pub fn stats(&self) -> RelayStats {
        match self {
            Self::Completed(stats) | Self::Cancelled(stats) => *stats,
        }
    }

    /// Check if the relay was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

/// Drive `events` into `sink`, flushing after every record.
///
/// Waits on whichever side is slower; nothing is dropped or reordered. A
/// transport or sink failure ends the relay with `Err` and stops reading
/// upstream. Cancellation is checked while waiting on either side.
pub async fn relay<S, E, K>(
    events: NdjsonStream<S>,
    sink: &mut K,
    cancel: &CancellationToken,
) -> StreamResult<RelayOutcome>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<BoxError> + std::fmt::Display,
    K: EventSink + ?Sized,
{
    let mut events = std::pin::pin!(events);

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            next = events.next() => Some(next),
        };
        let Some(next) = next else {
            debug!("NDJSON relay cancelled while reading");
            return Ok(RelayOutcome::Cancelled(events.stats()));
        };

        let event = match next {
            Some(Ok(event)) => event,
            Some(Err(error)) => {
                warn!(error = %error, "NDJSON relay aborted");
                return Err(error);
            }
            None => {
                let stats = events.stats();
                info!(
                    emitted = stats.emitted,
                    malformed = stats.malformed,
                    "NDJSON relay completed"
                );
                return Ok(RelayOutcome::Completed(stats));
            }
        };

        let written = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            written = write(&mut *sink, &event) => Some(written),
        };
        let Some(written) = written else {
            debug!("NDJSON relay cancelled while writing");
            return Ok(RelayOutcome::Cancelled(events.stats()));
        };

        if let Err(error) = written {
            warn!(error = %error, sequence = event.sequence(), "NDJSON sink rejected record");
            return Err(error);
        }
    }
}

async fn write<K>(sink: &mut K, event: &EmittedEvent) -> StreamResult<()>
where
    K: EventSink + ?Sized,
{
    sink.send(event).await?;
    sink.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StreamError;
    use crate::sink::{ChannelSink, MockEventSink};
    use futures::stream;
    use pretty_assertions::assert_eq;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn byte_stream(parts: &[&'static str]) -> impl Stream<Item = Result<Bytes, io::Error>> + Send {
        let items: Vec<Result<Bytes, io::Error>> = parts
            .iter()
            .map(|p| Ok(Bytes::from_static(p.as_bytes())))
            .collect();
        stream::iter(items)
    }

    #[tokio::test]
    async fn test_relay_to_channel() {
        let (mut sink, mut rx) = ChannelSink::channel(8);
        let events = NdjsonStream::new(byte_stream(&["{\"a\":1}\nnot-json\n", "{\"b\":", "2}"]));

        let outcome = relay(events, &mut sink, &CancellationToken::new())
            .await
            .unwrap();
        drop(sink);

        let mut lines = Vec::new();
        while let Some(line) = rx.recv().await {
            lines.push(line);
        }

        assert_eq!(
            lines,
            vec![
                Bytes::from_static(b"{\"a\":1}\n"),
                Bytes::from_static(b"{\"b\":2}\n"),
            ]
        );
        assert_eq!(
            outcome,
            RelayOutcome::Completed(RelayStats {
                emitted: 2,
                malformed: 1,
                bytes: 24,
            })
        );
    }

    #[tokio::test]
    async fn test_slow_consumer_applies_backpressure() {
        const RECORDS: usize = 50;

        let polled = Arc::new(AtomicUsize::new(0));
        let counter = polled.clone();
        let chunks: Vec<Result<Bytes, io::Error>> = (0..RECORDS)
            .map(|n| Ok(Bytes::from(format!("{{\"n\":{}}}\n", n))))
            .collect();
        let source = stream::iter(chunks).inspect(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let (mut sink, mut rx) = ChannelSink::channel(1);
        let task = tokio::spawn(async move {
            relay(NdjsonStream::new(source), &mut sink, &CancellationToken::new()).await
        });

        let mut received = 0;
        while let Some(line) = rx.recv().await {
            assert_eq!(line, Bytes::from(format!("{{\"n\":{}}}\n", received)));
            // At most one line queued in the channel and one held by the relay.
            assert!(polled.load(Ordering::SeqCst) <= received + 3);
            received += 1;
            for _ in 0..4 {
                tokio::task::yield_now().await;
            }
        }

        assert_eq!(received, RECORDS);
        let outcome = task.await.unwrap().unwrap();
        assert_eq!(outcome.stats().emitted, RECORDS as u64);
        assert_eq!(polled.load(Ordering::SeqCst), RECORDS);
    }

    #[tokio::test]
    async fn test_sink_failure_stops_upstream() {
        let polled = Arc::new(AtomicUsize::new(0));
        let counter = polled.clone();
        let source = byte_stream(&["{\"a\":1}\n", "{\"b\":2}\n", "{\"c\":3}\n"]).inspect(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let mut sink = MockEventSink::new();
        let mut calls = 0;
        sink.expect_send().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok(())
            } else {
                Err(StreamError::sink("client disconnected"))
            }
        });
        sink.expect_flush().times(1).returning(|| Ok(()));

        let err = relay(NdjsonStream::new(source), &mut sink, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.is_sink_failure());
        assert_eq!(polled.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_transport_failure_is_error() {
        let items: Vec<Result<Bytes, io::Error>> = vec![
            Ok(Bytes::from_static(b"{\"a\":1}\n")),
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "body cut short")),
        ];
        let (mut sink, mut rx) = ChannelSink::channel(8);

        let err = relay(
            NdjsonStream::new(stream::iter(items)),
            &mut sink,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, StreamError::Transport(_)));
        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"{\"a\":1}\n"));
    }

    #[tokio::test]
    async fn test_cancellation_drops_partial_record() {
        let source = byte_stream(&["{\"a\":1}\n{\"partial\":"]).chain(stream::pending());
        let (mut sink, mut rx) = ChannelSink::channel(8);
        let cancel = CancellationToken::new();

        let task = {
            let cancel = cancel.clone();
            tokio::spawn(async move { relay(NdjsonStream::new(source), &mut sink, &cancel).await })
        };

        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"{\"a\":1}\n"));
        cancel.cancel();

        let outcome = task.await.unwrap().unwrap();
        assert!(outcome.is_cancelled());
        assert_eq!(outcome.stats().emitted, 1);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_already_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut sink = MockEventSink::new();
        sink.expect_send().never();

        let outcome = relay(
            NdjsonStream::new(byte_stream(&["{\"a\":1}\n"])),
            &mut sink,
            &cancel,
        )
        .await
        .unwrap();

        assert_eq!(outcome, RelayOutcome::Cancelled(RelayStats::default()));
    }
}
