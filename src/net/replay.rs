//! Buffered-prefix replay stream.
//!
//! # Responsibilities
//! - Re-deliver bytes consumed during phase-1 inspection to the connection's
//!   final owner, byte-for-byte and in order
//! - Fall through to live reads once the prefix is drained
//! - Optionally park the prefix behind a gate until the handler signals
//!   readiness (deferred synchronization mode)
//!
//! Bytes are never pushed back into the OS receive buffer; the prefix sits
//! in front of the read interface.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;

/// A read/write stream that yields a buffered prefix before live reads.
///
/// Writes pass straight through to the underlying stream.
#[derive(Debug)]
pub struct ReplayStream<S = TcpStream> {
    inner: S,
    buffered: Vec<u8>,
    pos: usize,
    gated: bool,
    waker: Option<Waker>,
}

impl<S> ReplayStream<S> {
    /// Wrap `inner`, replaying `buffered` ahead of live reads.
    pub fn new(inner: S, buffered: Vec<u8>) -> Self {
        Self {
            inner,
            buffered,
            pos: 0,
            gated: false,
            waker: None,
        }
    }

    /// Like [`ReplayStream::new`], but a non-empty prefix stays parked until
    /// [`ReplayStream::release`] is called.
    pub fn gated(inner: S, buffered: Vec<u8>) -> Self {
        let gated = !buffered.is_empty();
        Self {
            inner,
            buffered,
            pos: 0,
            gated,
            waker: None,
        }
    }

    /// Prefix bytes not yet replayed.
    pub fn pending_replay(&self) -> usize {
        self.buffered.len() - self.pos
    }

    /// Whether reads are currently parked behind the replay gate.
    pub fn is_gated(&self) -> bool {
        self.gated
    }

    /// Open the replay gate; parked reads resume with the buffered prefix.
    pub fn release(&mut self) {
        if self.gated {
            self.gated = false;
            if let Some(waker) = self.waker.take() {
                waker.wake();
            }
        }
    }

    /// Consume the wrapper, returning the underlying stream.
    ///
    /// Any unreplayed prefix is discarded; callers use this only after
    /// draining the stream.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for ReplayStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let me = self.get_mut();

        if me.gated && me.pos < me.buffered.len() {
            me.waker = Some(cx.waker().clone());
            return Poll::Pending;
        }

        if me.pos < me.buffered.len() {
            let n = buf.remaining().min(me.buffered.len() - me.pos);
            buf.put_slice(&me.buffered[me.pos..me.pos + n]);
            me.pos += n;
            return Poll::Ready(Ok(()));
        }

        Pin::new(&mut me.inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for ReplayStream<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
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
}
