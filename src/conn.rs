//! Socket-level deadlines for served connections.
//!
//! hyper bounds the header block itself (`header_read_timeout`). It does not
//! bound a connection that simply goes quiet: a keep-alive client that never
//! sends its next request, or a peer that stops reading the response.
//! [`DeadlineStream`] fails any socket read or write that makes no progress
//! for longer than its timeout, and hyper then drops the connection.
//!
//! While a request is being handled the read side is left alone: hyper keeps
//! polling the socket for EOF, and the handler and body read have their own
//! bounds in the dispatcher.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::{Sleep, sleep};

/// Count of requests a single connection is handling right now.
#[derive(Clone, Default)]
pub(crate) struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    pub(crate) fn enter(&self) -> InFlightGuard {
        self.0.fetch_add(1, Ordering::AcqRel);
        InFlightGuard(Arc::clone(&self.0))
    }

    fn is_idle(&self) -> bool {
        self.0.load(Ordering::Acquire) == 0
    }
}

pub(crate) struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

pub(crate) struct DeadlineStream<S> {
    inner: S,
    in_flight: InFlight,
    read_timeout: Duration,
    write_timeout: Duration,
    read_deadline: Option<Pin<Box<Sleep>>>,
    write_deadline: Option<Pin<Box<Sleep>>>,
}

impl<S> DeadlineStream<S> {
    pub(crate) fn new(
        inner: S,
        in_flight: InFlight,
        read_timeout: Duration,
        write_timeout: Duration,
    ) -> Self {
        Self {
            inner,
            in_flight,
            read_timeout,
            write_timeout,
            read_deadline: None,
            write_deadline: None,
        }
    }
}

/// Arms `deadline` on the first stalled poll and fails once it fires.
/// Any progress in between clears it.
fn stalled<T>(
    deadline: &mut Option<Pin<Box<Sleep>>>,
    timeout: Duration,
    cx: &mut Context<'_>,
    op: &str,
) -> Poll<io::Result<T>> {
    let timer = deadline.get_or_insert_with(|| Box::pin(sleep(timeout)));
    ready!(timer.as_mut().poll(cx));
    *deadline = None;
    Poll::Ready(Err(io::Error::new(
        io::ErrorKind::TimedOut,
        format!("{op} stalled for {timeout:?}"),
    )))
}

impl<S: AsyncRead + Unpin> AsyncRead for DeadlineStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_read(cx, buf) {
            Poll::Ready(res) => {
                this.read_deadline = None;
                Poll::Ready(res)
            }
            Poll::Pending if !this.in_flight.is_idle() => {
                this.read_deadline = None;
                Poll::Pending
            }
            Poll::Pending => stalled(&mut this.read_deadline, this.read_timeout, cx, "read"),
        }
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for DeadlineStream<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_write(cx, buf) {
            Poll::Ready(res) => {
                this.write_deadline = None;
                Poll::Ready(res)
            }
            Poll::Pending => stalled(&mut this.write_deadline, this.write_timeout, cx, "write"),
        }
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_write_vectored(cx, bufs) {
            Poll::Ready(res) => {
                this.write_deadline = None;
                Poll::Ready(res)
            }
            Poll::Pending => stalled(&mut this.write_deadline, this.write_timeout, cx, "write"),
        }
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_flush(cx) {
            Poll::Ready(res) => {
                this.write_deadline = None;
                Poll::Ready(res)
            }
            Poll::Pending => stalled(&mut this.write_deadline, this.write_timeout, cx, "flush"),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};

    const SHORT: Duration = Duration::from_millis(100);

    #[tokio::test]
    async fn idle_reads_time_out() {
        let (_peer, local) = duplex(64);
        let mut stream = DeadlineStream::new(local, InFlight::default(), SHORT, SHORT);

        let mut buf = [0u8; 8];
        let err = stream.read(&mut buf).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[tokio::test]
    async fn reads_that_make_progress_are_not_cut_off() {
        let (mut peer, local) = duplex(64);
        let mut stream = DeadlineStream::new(local, InFlight::default(), SHORT, SHORT);

        for chunk in [b"ab", b"cd", b"ef"] {
            tokio::time::sleep(Duration::from_millis(60)).await;
            peer.write_all(chunk).await.unwrap();
            let mut buf = [0u8; 2];
            stream.read_exact(&mut buf).await.unwrap();
            assert_eq!(&buf, chunk);
        }
    }

    #[tokio::test]
    async fn reads_wait_while_a_request_is_in_flight() {
        let (mut peer, local) = duplex(64);
        let in_flight = InFlight::default();
        let mut stream = DeadlineStream::new(local, in_flight.clone(), SHORT, SHORT);

        let guard = in_flight.enter();
        let writer = tokio::spawn(async move {
            tokio::time::sleep(SHORT * 3).await;
            peer.write_all(b"x").await.unwrap();
            peer
        });

        let mut buf = [0u8; 1];
        stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"x");
        drop(guard);
        let _peer = writer.await.unwrap();

        let err = stream.read(&mut buf).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[tokio::test]
    async fn writes_to_a_peer_that_stopped_reading_time_out() {
        let (_peer, local) = duplex(8);
        let mut stream = DeadlineStream::new(local, InFlight::default(), SHORT, SHORT);

        let err = stream.write_all(&[0u8; 64]).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[test]
    fn guards_track_the_in_flight_count() {
        let in_flight = InFlight::default();
        assert!(in_flight.is_idle());
        let a = in_flight.enter();
        let b = in_flight.clone().enter();
        assert!(!in_flight.is_idle());
        drop(a);
        assert!(!in_flight.is_idle());
        drop(b);
        assert!(in_flight.is_idle());
    }
}
