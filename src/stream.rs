//! Streaming results.
//!
//! `query_many` returns a [`RowStream`]: a lazy, single-pass stream that yields one row per
//! poll in native order. Engines whose native client exposes a blocking iterator bridge it with
//! [`stream_blocking`] or [`stream_from_iter`]; engines with nothing to stream return
//! [`empty_stream`].

use futures_util::stream::{self, BoxStream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::SqlBridgeError;

pub type RowStream<'a, T> = BoxStream<'a, Result<T, SqlBridgeError>>;

/// A stream that ends immediately.
#[must_use]
pub fn empty_stream<'a, T: Send + 'a>() -> RowStream<'a, T> {
    stream::empty().boxed()
}

/// Producer side of [`stream_blocking`].
///
/// Each send blocks until the consumer has taken the previous item, so the producer runs at
/// most one element ahead.
pub struct StreamSink<T> {
    tx: mpsc::Sender<Result<T, SqlBridgeError>>,
}

impl<T> StreamSink<T> {
    /// Returns `false` once the consumer dropped the stream.
    pub fn send(&self, item: Result<T, SqlBridgeError>) -> bool {
        self.tx.blocking_send(item).is_ok()
    }

    /// Pull `iter` one element at a time into the stream. Stops early if the consumer hangs up.
    pub fn send_iter<I>(&self, iter: I) -> bool
    where
        I: IntoIterator<Item = Result<T, SqlBridgeError>>,
    {
        for item in iter {
            if !self.send(item) {
                return false;
            }
        }
        true
    }
}

/// Run `produce` on the blocking pool and expose what it sends as a [`RowStream`].
///
/// If the producer panics, the stream ends with an `ExecutionError` item instead of just
/// stopping. Must be called from within a Tokio runtime.
pub fn stream_blocking<T, F>(produce: F) -> RowStream<'static, T>
where
    T: Send + 'static,
    F: FnOnce(StreamSink<T>) + Send + 'static,
{
    let (tx, rx) = mpsc::channel(1);
    let producer: JoinHandle<()> =
        tokio::task::spawn_blocking(move || produce(StreamSink { tx }));
    stream::unfold((rx, Some(producer)), |(mut rx, producer)| async move {
        if let Some(item) = rx.recv().await {
            return Some((item, (rx, producer)));
        }
        match producer?.await {
            Ok(()) => None,
            Err(err) => Some((Err(SqlBridgeError::from(err)), (rx, None))),
        }
    })
    .boxed()
}

/// Adapt a native pull-based iterator into a [`RowStream`], preserving order.
///
/// Must be called from within a Tokio runtime.
pub fn stream_from_iter<T, I>(iter: I) -> RowStream<'static, T>
where
    T: Send + 'static,
    I: IntoIterator<Item = Result<T, SqlBridgeError>> + Send + 'static,
{
    stream_blocking(move |sink| {
        sink.send_iter(iter);
    })
}
