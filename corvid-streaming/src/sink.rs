//! Downstream sinks for emitted events.

use crate::error::{StreamError, StreamResult};
use crate::record::EmittedEvent;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

/// Destination for emitted events.
///
/// The relay calls [`flush`](Self::flush) after every [`send`](Self::send), so
/// an implementation must not hold events back.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventSink: Send {
    /// Write one event.
    async fn send(&mut self, event: &EmittedEvent) -> StreamResult<()>;

    /// Push written events through to the consumer.
    async fn flush(&mut self) -> StreamResult<()>;
}

/// Sink that forwards each event as one `\n`-terminated line over a channel.
///
/// The receiving half typically feeds a chunked HTTP body.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Bytes>,
}

impl ChannelSink {
    /// Wrap an existing sender.
    pub fn new(tx: mpsc::Sender<Bytes>) -> Self {
        Self { tx }
    }

    /// Create a sink and its receiving half.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn send(&mut self, event: &EmittedEvent) -> StreamResult<()> {
        self.tx
            .send(event.to_line_bytes())
            .await
            .map_err(|_| StreamError::sink("receiver dropped"))
    }

    async fn flush(&mut self) -> StreamResult<()> {
        if self.tx.is_closed() {
            return Err(StreamError::sink("receiver dropped"));
        }
        Ok(())
    }
}

/// Sink that writes NDJSON lines to an async writer.
#[derive(Debug)]
pub struct WriterSink<W> {
    writer: W,
}

impl<W> WriterSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Wrap a writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Take the writer back.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W> EventSink for WriterSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, event: &EmittedEvent) -> StreamResult<()> {
        self.writer.write_all(&event.to_line_bytes()).await?;
        Ok(())
    }

    async fn flush(&mut self) -> StreamResult<()> {
        self.writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_channel_sink_sends_lines() {
        let (mut sink, mut rx) = ChannelSink::channel(4);
        let event = EmittedEvent::from_value(json!({"a": 1}), 0);

        sink.send(&event).await.unwrap();
        sink.flush().await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"{\"a\":1}\n"));
    }

    #[tokio::test]
    async fn test_channel_sink_receiver_dropped() {
        let (mut sink, rx) = ChannelSink::channel(4);
        drop(rx);

        let event = EmittedEvent::from_value(json!(true), 0);
        let err = sink.send(&event).await.unwrap_err();
        assert!(err.is_sink_failure());
        assert!(sink.flush().await.is_err());
    }

    #[tokio::test]
    async fn test_writer_sink() {
        let mut sink = WriterSink::new(Vec::new());
        sink.send(&EmittedEvent::from_value(json!({"a": 1}), 0))
            .await
            .unwrap();
        sink.send(&EmittedEvent::from_value(json!([1, 2]), 1))
            .await
            .unwrap();
        sink.flush().await.unwrap();

        assert_eq!(sink.into_inner(), b"{\"a\":1}\n[1,2]\n".to_vec());
    }
}
