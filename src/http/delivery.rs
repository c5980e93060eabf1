//! Transcript delivery tied to the connection's write side.
//!
//! # Responsibilities
//! - Hold transcripts whose response body hyper has released ([`Outbox`])
//! - Hand them to the transcript sink once the socket flush that follows has completed
//!
//! # Design Decisions
//! - hyper drops a response body as soon as its last frame is buffered, before the
//!   bytes leave the process; the body only parks its transcript
//! - hyper flushes the stream only after its write buffer is empty, so a completed
//!   flush means every parked response has been handed to the socket
//! - Transcripts still parked when the connection goes away are discarded: their
//!   responses never reached the client

use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::observability::{Transcript, TranscriptSink};

/// Per-connection holding area for transcripts awaiting a flush.
#[derive(Debug, Clone, Default)]
pub struct Outbox {
    parked: Arc<Mutex<Vec<Transcript>>>,
}

impl Outbox {
    pub fn park(&self, transcript: Transcript) {
        self.lock().push(transcript);
    }

    fn take_all(&self) -> Vec<Transcript> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Transcript>> {
        self.parked.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Connection stream that releases parked transcripts after each completed flush.
#[derive(Debug)]
pub struct DeliveryStream<S> {
    inner: S,
    outbox: Outbox,
    sink: TranscriptSink,
}

impl<S> DeliveryStream<S> {
    pub fn new(inner: S, outbox: Outbox, sink: TranscriptSink) -> Self {
        Self {
            inner,
            outbox,
            sink,
        }
    }

    fn deliver(&self) {
        for transcript in self.outbox.take_all() {
            self.sink.send(transcript);
        }
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for DeliveryStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for DeliveryStream<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write(cx, buf)
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let flushed = Pin::new(&mut this.inner).poll_flush(cx);
        if let Poll::Ready(Ok(())) = flushed {
            this.deliver();
        }
        flushed
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

impl<S> Drop for DeliveryStream<S> {
    fn drop(&mut self) {
        let undelivered = self.outbox.take_all().len();
        if undelivered > 0 {
            tracing::debug!(
                undelivered,
                "Connection closed before the response was written; transcript dropped"
            );
        }
    }
}
