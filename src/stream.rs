//! Supervised streaming sessions.
//!
//! [`stream`] drives a [`RingDecoder`] from an async byte source while
//! watching a [`StreamContext`] for a deadline or a cancellation. Every way a
//! session can end resolves the same signal, and the first cause recorded is
//! the session's result.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::Error;
use crate::incremental::{RingDecoder, Terminal};

type Signal = watch::Sender<Option<Terminal>>;

fn resolve(signal: &Signal, cause: Terminal) {
    signal.send_if_modified(|slot| {
        if slot.is_some() {
            return false;
        }
        *slot = Some(cause);
        true
    });
}

/// Deadline and cancellation signal shared by one streaming session
#[derive(Debug, Clone)]
pub struct StreamContext {
    deadline: Option<Instant>,
    signal: Arc<Signal>,
}

impl Default for StreamContext {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamContext {
    /// A context with no deadline
    pub fn new() -> Self {
        StreamContext {
            deadline: None,
            signal: Arc::new(watch::Sender::new(None)),
        }
    }

    /// Expire `timeout` from now
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Expire at `deadline`
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// A handle that cancels sessions using this context
    pub fn canceller(&self) -> Canceller {
        Canceller {
            signal: Arc::clone(&self.signal),
        }
    }

    /// The recorded terminal cause, once the session has ended
    pub fn cause(&self) -> Option<Terminal> {
        self.signal.borrow().clone()
    }
}

/// Cancels the session of the [`StreamContext`] it came from
#[derive(Debug, Clone)]
pub struct Canceller {
    signal: Arc<Signal>,
}

impl Canceller {
    /// Record [`Terminal::Cancelled`] unless the session already ended
    pub fn cancel(&self) {
        resolve(&self.signal, Terminal::Cancelled);
    }
}

/// Run `decoder` over `reader` until the source ends, fails, the deadline
/// passes or the context is cancelled, and return the first of those causes.
///
/// `hook` runs inline with the reads, once per completed lap of the ring.
pub async fn stream<R, F>(
    decoder: &mut RingDecoder,
    reader: &mut R,
    hook: F,
    ctx: &StreamContext,
) -> Terminal
where
    R: embedded_io_async::Read,
    F: FnMut(&RingDecoder, &[u8]) -> Result<(), Error>,
{
    let mut rx = ctx.signal.subscribe();
    let expiry = async {
        match ctx.deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => core::future::pending().await,
        }
    };

    tokio::select! {
        biased;
        _ = rx.wait_for(Option::is_some) => {}
        _ = expiry => resolve(&ctx.signal, Terminal::DeadlineExceeded),
        cause = decoder.read_from_async(reader, hook) => resolve(&ctx.signal, cause),
    }

    let cause = ctx.cause().unwrap_or(Terminal::Cancelled);
    crate::debug!("stream session resolved: {}", cause);
    cause
}

/// Adapts a tokio reader to [`embedded_io_async::Read`]
#[derive(Debug)]
pub struct TokioSource<R> {
    inner: R,
}

impl<R> TokioSource<R> {
    /// Wrap `inner`
    pub fn new(inner: R) -> Self {
        TokioSource { inner }
    }

    /// Unwrap the reader
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl TokioSource<tokio::fs::File> {
    /// Open the file at `path` for streaming
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self::new(tokio::fs::File::open(path).await?))
    }
}

impl<R: AsyncRead + Unpin> embedded_io_async::ErrorType for TokioSource<R> {
    type Error = std::io::Error;
}

impl<R: AsyncRead + Unpin> embedded_io_async::Read for TokioSource<R> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.inner.read(buf).await
    }
}
