//! Command-line front end: turns text commands into published operations.
//!
//! Each input line is parsed with [`ordkv_core::command::parse`], encoded
//! with the wire codec and handed to a [`MessageSink`]. A [`Responder`]
//! reports the outcome of every line to the user.

use std::future::Future;
use std::io::{self, Write};
use std::sync::Arc;

use ordkv_core::command::{self, HELP};
use ordkv_core::messages::encode;
use ordkv_core::{CommandError, Operation};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

use crate::traits::{MessageSink, TransportError};

/// Why a command line could not be published.
#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("error encoding operation: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ExecuteError {
    /// Whether the command help should follow the error message.
    #[must_use]
    pub fn wants_help(&self) -> bool {
        matches!(self, Self::Command(e) if e.wants_help())
    }
}

/// Parses command lines and publishes the resulting operations.
#[derive(Clone)]
pub struct Executor {
    sink: Arc<dyn MessageSink>,
}

impl Executor {
    #[must_use]
    pub fn new(sink: Arc<dyn MessageSink>) -> Self {
        Self { sink }
    }

    /// Parses `line` and sends the encoded operation.
    ///
    /// # Errors
    ///
    /// Returns the parse, encoding or transport failure.
    pub async fn execute(&self, line: &str) -> Result<Operation, ExecuteError> {
        let op = command::parse(line)?;
        let body = encode(&op)?;
        self.sink.send(body).await?;
        debug!(operation = op.name(), "operation published");
        Ok(op)
    }
}

/// Reports command outcomes to the user.
pub trait Responder: Send {
    fn help(&mut self) -> io::Result<()>;
    fn ok(&mut self) -> io::Result<()>;
    fn error(&mut self, err: &ExecuteError) -> io::Result<()>;
    fn bye(&mut self) -> io::Result<()>;
}

/// Full feedback for a user typing at a terminal.
pub struct InteractiveResponder<W> {
    out: W,
}

impl<W: Write + Send> InteractiveResponder<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Responder for InteractiveResponder<W> {
    fn help(&mut self) -> io::Result<()> {
        writeln!(self.out, "{HELP}")
    }

    fn ok(&mut self) -> io::Result<()> {
        writeln!(self.out, "OK")
    }

    fn error(&mut self, err: &ExecuteError) -> io::Result<()> {
        writeln!(self.out, "{err}")
    }

    fn bye(&mut self) -> io::Result<()> {
        writeln!(self.out, "Bye")
    }
}

/// Reports errors only, for commands read from a file.
pub struct BatchResponder<W> {
    out: W,
}

impl<W: Write + Send> BatchResponder<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Responder for BatchResponder<W> {
    fn help(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn ok(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn error(&mut self, err: &ExecuteError) -> io::Result<()> {
        writeln!(self.out, "{err}")
    }

    fn bye(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Feeds every line of `input` through `executor` until end of input or
/// until `shutdown` resolves. Blank lines are skipped.
///
/// # Errors
///
/// Returns I/O errors from reading `input` or writing responses.
pub async fn run_client<R>(
    executor: &Executor,
    responder: &mut dyn Responder,
    input: R,
    shutdown: impl Future<Output = ()>,
) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    tokio::pin!(shutdown);

    responder.help()?;
    loop {
        let line = tokio::select! {
            () = &mut shutdown => {
                responder.bye()?;
                return Ok(());
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            return Ok(());
        };
        if line.trim().is_empty() {
            continue;
        }

        match executor.execute(&line).await {
            Ok(_) => responder.ok()?,
            Err(e) => {
                responder.error(&e)?;
                if e.wants_help() {
                    responder.help()?;
                }
            }
        }
    }
}
