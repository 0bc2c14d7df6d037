use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;

/// How messages are framed on a connected stream.
///
/// TCP carries a bare 8-byte length; IPC adds a one-byte message type in front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    Tcp,
    Ipc,
}

/// A connected, handshaken scalability-protocol stream.
///
/// Wraps a TCP stream or, on Unix, a Unix domain socket stream.
pub struct SpStream {
    inner: SpStreamInner,
}

enum SpStreamInner {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(tokio::net::UnixStream),
}

impl SpStream {
    pub(crate) fn from_tcp(stream: TcpStream) -> Self {
        Self {
            inner: SpStreamInner::Tcp(stream),
        }
    }

    #[cfg(unix)]
    pub(crate) fn from_unix(stream: tokio::net::UnixStream) -> Self {
        Self {
            inner: SpStreamInner::Unix(stream),
        }
    }

    /// Framing flavor required by this stream.
    pub fn flavor(&self) -> Flavor {
        match &self.inner {
            SpStreamInner::Tcp(_) => Flavor::Tcp,
            #[cfg(unix)]
            SpStreamInner::Unix(_) => Flavor::Ipc,
        }
    }
}

impl AsyncRead for SpStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut self.get_mut().inner {
            SpStreamInner::Tcp(stream) => Pin::new(stream).poll_read(cx, buf),
            #[cfg(unix)]
            SpStreamInner::Unix(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for SpStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match &mut self.get_mut().inner {
            SpStreamInner::Tcp(stream) => Pin::new(stream).poll_write(cx, buf),
            #[cfg(unix)]
            SpStreamInner::Unix(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut self.get_mut().inner {
            SpStreamInner::Tcp(stream) => Pin::new(stream).poll_flush(cx),
            #[cfg(unix)]
            SpStreamInner::Unix(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut self.get_mut().inner {
            SpStreamInner::Tcp(stream) => Pin::new(stream).poll_shutdown(cx),
            #[cfg(unix)]
            SpStreamInner::Unix(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

impl std::fmt::Debug for SpStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            SpStreamInner::Tcp(_) => f.debug_struct("SpStream").field("type", &"tcp").finish(),
            #[cfg(unix)]
            SpStreamInner::Unix(_) => f.debug_struct("SpStream").field("type", &"ipc").finish(),
        }
    }
}
