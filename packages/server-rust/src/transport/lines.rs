//! Newline-delimited JSON records over async readers and writers.
//!
//! `ordkv-client` writes one encoded operation per line to stdout and
//! `ordkv-server` reads them back from stdin or a file, so the two binaries
//! can be chained with a pipe. A line stream has no redelivery:
//! acknowledging is a no-op and a rejected line is simply gone.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::sync::Mutex;
use tracing::info;

use crate::traits::{MessageSink, MessageSource, RawMessage, TransportError};

struct LineState<R> {
    lines: Lines<R>,
    exhausted: bool,
}

/// Reads one message per non-blank line.
pub struct LineSource<R> {
    name: String,
    state: Mutex<LineState<R>>,
    line_number: AtomicU64,
}

impl<R> LineSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    #[must_use]
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(LineState {
                lines: reader.lines(),
                exhausted: false,
            }),
            line_number: AtomicU64::new(0),
        }
    }

    /// Whether the underlying reader hit end of input.
    pub async fn is_exhausted(&self) -> bool {
        self.state.lock().await.exhausted
    }

    /// Reads the next non-blank line. `Ok(None)` means end of input.
    async fn next_record(
        &self,
        state: &mut LineState<R>,
    ) -> Result<Option<RawMessage>, TransportError> {
        loop {
            let Some(line) = state.lines.next_line().await? else {
                state.exhausted = true;
                info!(source = %self.name, "end of input reached");
                return Ok(None);
            };
            let number = self.line_number.fetch_add(1, Ordering::Relaxed) + 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            return Ok(Some(RawMessage::new(format!("{}:{number}", self.name), line)));
        }
    }
}

impl LineSource<BufReader<tokio::io::Stdin>> {
    /// Reads records from the process's standard input.
    #[must_use]
    pub fn stdin() -> Self {
        Self::new("stdin", BufReader::new(tokio::io::stdin()))
    }
}

impl LineSource<BufReader<tokio::fs::File>> {
    /// Reads records from the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be opened.
    pub async fn open(path: &Path) -> std::io::Result<Self> {
        let file = tokio::fs::File::open(path).await?;
        Ok(Self::new(path.display().to_string(), BufReader::new(file)))
    }
}

#[async_trait]
impl<R> MessageSource for LineSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    fn describe(&self) -> String {
        format!("lines://{}", self.name)
    }

    async fn receive(
        &self,
        max_messages: usize,
        wait: Duration,
    ) -> Result<Vec<RawMessage>, TransportError> {
        let mut state = self.state.lock().await;
        if state.exhausted {
            // Nothing more will ever arrive; behave like an idle long poll.
            drop(state);
            tokio::time::sleep(wait).await;
            return Ok(Vec::new());
        }

        let mut batch = Vec::new();
        // `next_line` is cancel safe, so timing out loses no partial line.
        match tokio::time::timeout(wait, self.next_record(&mut state)).await {
            Ok(Ok(Some(first))) => batch.push(first),
            Ok(Ok(None)) | Err(_) => return Ok(batch),
            Ok(Err(e)) => return Err(e),
        }
        // Fill the batch only with lines that are already available.
        while batch.len() < max_messages {
            match tokio::time::timeout(Duration::ZERO, self.next_record(&mut state)).await {
                Ok(Ok(Some(next))) => batch.push(next),
                Ok(Ok(None)) | Err(_) => break,
                Ok(Err(e)) => return Err(e),
            }
        }
        Ok(batch)
    }

    async fn acknowledge(&self, _message: &RawMessage) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Writes one message per line, flushing after each.
pub struct LineSink<W> {
    writer: Mutex<W>,
}

impl<W> LineSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Gives the writer back.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl LineSink<tokio::io::Stdout> {
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

#[async_trait]
impl<W> MessageSink for LineSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&self, body: String) -> Result<(), TransportError> {
        let mut writer = self.writer.lock().await;
        writer.write_all(body.as_bytes()).await.map_err(write_error)?;
        writer.write_all(b"\n").await.map_err(write_error)?;
        writer.flush().await.map_err(write_error)
    }
}

/// A reader that went away closes the sink; anything else fails this send.
fn write_error(e: std::io::Error) -> TransportError {
    if e.kind() == std::io::ErrorKind::BrokenPipe {
        TransportError::Closed
    } else {
        TransportError::Send(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(input: &'static str) -> LineSource<&'static [u8]> {
        LineSource::new("test", input.as_bytes())
    }

    #[tokio::test]
    async fn reads_batches_and_skips_blank_lines() {
        let source = source("{\"a\":1}\n\n   \n{\"b\":2}\n{\"c\":3}\n");

        let batch = source.receive(2, Duration::from_secs(1)).await.unwrap();
        let bodies: Vec<_> = batch.iter().filter_map(|m| m.body.as_deref()).collect();
        assert_eq!(bodies, vec![r#"{"a":1}"#, r#"{"b":2}"#]);
        assert_eq!(batch[1].receipt, "test:4");

        let batch = source.receive(2, Duration::from_secs(1)).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].body.as_deref(), Some(r#"{"c":3}"#));
        source.acknowledge(&batch[0]).await.unwrap();
    }

    #[tokio::test]
    async fn end_of_input_yields_empty_batches() {
        let source = source("only\n");
        assert_eq!(source.receive(10, Duration::from_secs(1)).await.unwrap().len(), 1);
        assert!(source.receive(10, Duration::from_millis(10)).await.unwrap().is_empty());
        assert!(source.is_exhausted().await);
        assert!(source.receive(10, Duration::from_millis(10)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn opens_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ops.jsonl");
        std::fs::write(&path, "one\ntwo\n").unwrap();

        let source = LineSource::open(&path).await.unwrap();
        assert!(source.describe().ends_with("ops.jsonl"));
        let mut bodies = Vec::new();
        while !source.is_exhausted().await {
            for message in source.receive(10, Duration::from_millis(50)).await.unwrap() {
                bodies.extend(message.body);
            }
        }
        assert_eq!(bodies, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn sink_writes_one_record_per_line() {
        let sink = LineSink::new(Vec::new());
        sink.send(r#"{"operation":"GetAll"}"#.to_string()).await.unwrap();
        sink.send(r#"{"operation":"Get","itemId":"1"}"#.to_string()).await.unwrap();

        let written = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            written,
            "{\"operation\":\"GetAll\"}\n{\"operation\":\"Get\",\"itemId\":\"1\"}\n"
        );
    }

    struct FailingWriter(std::io::ErrorKind);

    impl AsyncWrite for FailingWriter {
        fn poll_write(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &[u8],
        ) -> std::task::Poll<std::io::Result<usize>> {
            std::task::Poll::Ready(Err(self.0.into()))
        }

        fn poll_flush(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn sink_reports_closed_reader_and_failed_writes() {
        let closed = LineSink::new(FailingWriter(std::io::ErrorKind::BrokenPipe));
        let err = closed.send("{}".to_string()).await.unwrap_err();
        assert!(matches!(err, TransportError::Closed));

        let failing = LineSink::new(FailingWriter(std::io::ErrorKind::Other));
        let err = failing.send("{}".to_string()).await.unwrap_err();
        assert!(matches!(err, TransportError::Send(_)));
    }
}
