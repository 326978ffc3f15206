//! Pull-based NDJSON stream adapter.

use crate::decoder::NdjsonDecoder;
use crate::error::{BoxError, StreamError, StreamResult};
use crate::record::{EmittedEvent, Record};
use bytes::Bytes;
use futures::stream::FusedStream;
use futures::{ready, Stream};
use pin_project_lite::pin_project;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::{debug, warn};

/// Counters for a single relay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Records emitted downstream.
    pub emitted: u64,
    /// Records skipped because they failed to parse.
    pub malformed: u64,
    /// Bytes received from upstream.
    pub bytes: u64,
}

pin_project! {
    /// Stream adapter that turns a chunked byte stream into emitted events.
    ///
    /// Malformed records are logged and skipped. A transport failure, or a
    /// record over the size limit, is yielded once as `Err` and the stream
    /// then ends. Dropping the adapter drops the upstream stream with it.
    pub struct NdjsonStream<S> {
        #[pin]
        inner: S,
        decoder: NdjsonDecoder,
        pending: VecDeque<Record>,
        failure: Option<StreamError>,
        stats: RelayStats,
        finished: bool,
    }
}

impl<S, E> NdjsonStream<S>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<BoxError> + std::fmt::Display,
{
    /// Create a new NDJSON stream from a byte stream.
    pub fn new(inner: S) -> Self {
        Self::with_decoder(inner, NdjsonDecoder::new())
    }

    /// Create a new NDJSON stream with a custom decoder.
    pub fn with_decoder(inner: S, decoder: NdjsonDecoder) -> Self {
        Self {
            inner,
            decoder,
            pending: VecDeque::new(),
            failure: None,
            stats: RelayStats::default(),
            finished: false,
        }
    }
}

impl<S> NdjsonStream<S> {
    /// Counters so far.
    pub fn stats(&self) -> RelayStats {
        self.stats
    }

    /// Whether the stream has ended, cleanly or not.
    pub fn is_finished(&self) -> bool {
        self.finished && self.pending.is_empty() && self.failure.is_none()
    }
}

impl<S, E> Stream for NdjsonStream<S>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<BoxError> + std::fmt::Display,
{
    type Item = StreamResult<EmittedEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            while let Some(record) = this.pending.pop_front() {
                if let Some(event) = emit(record, this.stats) {
                    return Poll::Ready(Some(Ok(event)));
                }
            }

            if let Some(error) = this.failure.take() {
                *this.finished = true;
                this.decoder.clear();
                return Poll::Ready(Some(Err(error)));
            }

            if *this.finished {
                return Poll::Ready(None);
            }

            match ready!(this.inner.as_mut().poll_next(cx)) {
                Some(Ok(bytes)) => {
                    this.stats.bytes += bytes.len() as u64;
                    if let Err(error) = this.decoder.feed_into(&bytes, this.pending) {
                        *this.failure = Some(error);
                    }
                }
                Some(Err(e)) => {
                    warn!(error = %e, "NDJSON upstream failed");
                    *this.failure = Some(StreamError::transport(e));
                }
                None => {
                    *this.finished = true;
                    if let Some(tail) = this.decoder.finish() {
                        this.pending.push_back(tail);
                    }
                    debug!(
                        emitted = this.stats.emitted,
                        malformed = this.stats.malformed,
                        bytes = this.stats.bytes,
                        "NDJSON upstream finished"
                    );
                }
            }
        }
    }
}

impl<S, E> FusedStream for NdjsonStream<S>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<BoxError> + std::fmt::Display,
{
    fn is_terminated(&self) -> bool {
        self.is_finished()
    }
}

fn emit(record: Record, stats: &mut RelayStats) -> Option<EmittedEvent> {
    match record.parse() {
        Ok(value) => {
            let event = EmittedEvent::from_value(value, stats.emitted);
            stats.emitted += 1;
            Some(event)
        }
        Err(err) => {
            stats.malformed += 1;
            warn!(
                line = err.line,
                kind = ?err.kind,
                error = %err.message,
                "Skipping malformed NDJSON record"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{stream, StreamExt};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::io;

    fn chunks<T: AsRef<[u8]>>(parts: &[T]) -> impl Stream<Item = Result<Bytes, io::Error>> + Unpin {
        let items: Vec<Result<Bytes, io::Error>> = parts
            .iter()
            .map(|p| Ok(Bytes::copy_from_slice(p.as_ref())))
            .collect();
        stream::iter(items)
    }

    fn collect_lines<S>(stream: NdjsonStream<S>) -> Vec<String>
    where
        S: Stream<Item = Result<Bytes, io::Error>> + Unpin,
    {
        tokio_test::block_on(async move {
            stream
                .map(|item| item.unwrap().as_str().to_string())
                .collect()
                .await
        })
    }

    const MIXED: &str = "{\"a\":1}\n\n{\"text\":\"naïve ✓\",\"n\":[1,2]}\r\nnot-json\n{\"b\":2}";

    #[test]
    fn test_two_records_one_chunk() {
        let lines = collect_lines(NdjsonStream::new(chunks(&["{\"a\":1}\n{\"b\":2}\n"])));
        assert_eq!(lines, vec![r#"{"a":1}"#, r#"{"b":2}"#]);
    }

    #[test]
    fn test_split_record_reassembly() {
        let lines = collect_lines(NdjsonStream::new(chunks(&["{\"a\":", "1}\n"])));
        assert_eq!(lines, vec![r#"{"a":1}"#]);
    }

    #[test]
    fn test_blank_segments_skipped() {
        let lines = collect_lines(NdjsonStream::new(chunks(&["{\"a\":1}\n\n{\"b\":2}\n"])));
        assert_eq!(lines, vec![r#"{"a":1}"#, r#"{"b":2}"#]);
    }

    #[test]
    fn test_unicode_blank_lines_not_malformed() {
        let mut stream = NdjsonStream::new(chunks(&["{\"a\":1}\n\x0B\n\u{a0}\n"]));

        tokio_test::block_on(async {
            while let Some(item) = stream.next().await {
                item.unwrap();
            }
        });

        assert_eq!(stream.stats().emitted, 1);
        assert_eq!(stream.stats().malformed, 0);
    }

    #[test]
    fn test_malformed_record_skipped() {
        let mut stream = NdjsonStream::new(chunks(&["{\"a\":1}\nnot-json\n{\"b\":2}\n"]));

        let lines: Vec<String> = tokio_test::block_on(async {
            let mut lines = Vec::new();
            while let Some(item) = stream.next().await {
                lines.push(item.unwrap().as_str().to_string());
            }
            lines
        });

        assert_eq!(lines, vec![r#"{"a":1}"#, r#"{"b":2}"#]);
        assert_eq!(stream.stats().malformed, 1);
        assert_eq!(stream.stats().emitted, 2);
        assert!(stream.is_terminated());
    }

    #[test]
    fn test_tail_flushed_at_end_of_stream() {
        let lines = collect_lines(NdjsonStream::new(chunks(&["{\"a\":1}\n{\"b\":2}"])));
        assert_eq!(lines, vec![r#"{"a":1}"#, r#"{"b":2}"#]);
    }

    #[test]
    fn test_sequence_numbers_follow_emission() {
        let events: Vec<EmittedEvent> = tokio_test::block_on(
            NdjsonStream::new(chunks(&["{\"a\":1}\nbad\n{\"b\":2}\n"]))
                .map(Result::unwrap)
                .collect(),
        );
        let sequences: Vec<u64> = events.iter().map(EmittedEvent::sequence).collect();
        assert_eq!(sequences, vec![0, 1]);
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(3)]
    #[case(5)]
    #[case(8)]
    #[case(13)]
    #[case(1024)]
    fn test_chunking_invariance(#[case] size: usize) {
        let expected = collect_lines(NdjsonStream::new(chunks(&[MIXED.as_bytes()])));
        assert_eq!(expected.len(), 3);

        let parts: Vec<&[u8]> = MIXED.as_bytes().chunks(size).collect();
        let lines = collect_lines(NdjsonStream::new(chunks(&parts)));
        assert_eq!(lines, expected);
    }

    #[test]
    fn test_every_two_way_split() {
        let bytes = MIXED.as_bytes();
        let expected = collect_lines(NdjsonStream::new(chunks(&[bytes])));

        for cut in 0..=bytes.len() {
            let lines = collect_lines(NdjsonStream::new(chunks(&[&bytes[..cut], &bytes[cut..]])));
            assert_eq!(lines, expected, "split at byte {}", cut);
        }
    }

    #[test]
    fn test_transport_error_is_terminal() {
        let items: Vec<Result<Bytes, io::Error>> = vec![
            Ok(Bytes::from_static(b"{\"a\":1}\n{\"b\":")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer")),
            Ok(Bytes::from_static(b"2}\n")),
        ];
        let mut stream = NdjsonStream::new(stream::iter(items));

        tokio_test::block_on(async {
            let first = stream.next().await.unwrap().unwrap();
            assert_eq!(first.as_str(), r#"{"a":1}"#);

            let err = stream.next().await.unwrap().unwrap_err();
            assert!(matches!(err, StreamError::Transport(_)));
            assert!(err.to_string().contains("reset by peer"));
            assert_eq!(
                err.transport_source::<io::Error>().unwrap().kind(),
                io::ErrorKind::ConnectionReset
            );

            // The partial record is discarded, not flushed.
            assert!(stream.next().await.is_none());
            assert!(stream.next().await.is_none());
        });
    }

    #[test]
    fn test_oversized_record_is_terminal() {
        let decoder = NdjsonDecoder::with_max_record_len(16);
        let mut stream = NdjsonStream::with_decoder(
            chunks(&["{\"a\":1}\n{\"big\":\"0123456789abcdef\"}\n{\"c\":3}\n"]),
            decoder,
        );

        tokio_test::block_on(async {
            assert_eq!(stream.next().await.unwrap().unwrap().as_str(), r#"{"a":1}"#);
            let err = stream.next().await.unwrap().unwrap_err();
            assert!(matches!(err, StreamError::RecordTooLarge { max: 16, .. }));
            assert!(stream.next().await.is_none());
        });
    }

    #[test]
    fn test_stats_count_bytes() {
        let mut stream = NdjsonStream::new(chunks(&["{\"a\":1}\n", "{\"b\":2}\n"]));
        tokio_test::block_on(async { while stream.next().await.is_some() {} });

        assert_eq!(
            stream.stats(),
            RelayStats {
                emitted: 2,
                malformed: 0,
                bytes: 16,
            }
        );
    }
}
