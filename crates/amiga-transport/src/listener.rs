#[cfg(unix)]
use std::os::unix::fs::{FileTypeExt, MetadataExt};
#[cfg(unix)]
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::address::Address;
use crate::error::{Result, TransportError};
use crate::protocol::{exchange_headers, Protocol};
use crate::stream::SpStream;

/// How long an accepted peer has to send its connection header.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(2);

/// Listening side of a scalability-protocol socket.
///
/// Robots and simulators listen; the SDK itself only dials. Each accepted
/// stream has already completed the connection-header exchange.
pub struct SpListener {
    inner: ListenerInner,
    address: Address,
    protocol: Protocol,
    handshake_timeout: Duration,
    #[cfg(unix)]
    socket_file: Option<SocketFile>,
}

enum ListenerInner {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(tokio::net::UnixListener),
}

#[cfg(unix)]
struct SocketFile {
    path: PathBuf,
    dev: u64,
    ino: u64,
}

impl SpListener {
    /// Bind and listen on `address` for peers of `protocol.peer()`.
    ///
    /// Binding TCP port 0 picks a free port; [`SpListener::local_address`]
    /// reports the one chosen. An `ipc://` path holding a stale socket is
    /// replaced, but any other existing file is left alone.
    pub async fn bind(address: &Address, protocol: Protocol) -> Result<Self> {
        match address {
            Address::Tcp { host, port } => {
                let listener = TcpListener::bind((host.as_str(), *port))
                    .await
                    .map_err(|source| TransportError::Bind {
                        address: address.to_string(),
                        source,
                    })?;
                let local = listener.local_addr()?;
                let address = Address::tcp(host.clone(), local.port());
                info!(%address, protocol = protocol.name(), "listening");
                Ok(Self {
                    inner: ListenerInner::Tcp(listener),
                    address,
                    protocol,
                    handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
                    #[cfg(unix)]
                    socket_file: None,
                })
            }
            #[cfg(unix)]
            Address::Ipc(path) => {
                remove_stale_socket(address, path)?;
                let listener = tokio::net::UnixListener::bind(path).map_err(|source| {
                    TransportError::Bind {
                        address: address.to_string(),
                        source,
                    }
                })?;
                let metadata =
                    std::fs::symlink_metadata(path).map_err(|source| TransportError::Bind {
                        address: address.to_string(),
                        source,
                    })?;
                info!(%address, protocol = protocol.name(), "listening");
                Ok(Self {
                    inner: ListenerInner::Unix(listener),
                    address: address.clone(),
                    protocol,
                    handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
                    socket_file: Some(SocketFile {
                        path: path.clone(),
                        dev: metadata.dev(),
                        ino: metadata.ino(),
                    }),
                })
            }
            #[cfg(not(unix))]
            Address::Ipc(_) => Err(TransportError::InvalidAddress {
                address: address.to_string(),
                reason: "ipc transport requires unix domain sockets",
            }),
        }
    }

    /// Bound the header exchange of each accepted peer by `timeout`.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Accept one connection and complete its handshake.
    ///
    /// A peer that stays silent for the handshake timeout is dropped with
    /// [`TransportError::Timeout`].
    pub async fn accept(&self) -> Result<SpStream> {
        let mut stream = match &self.inner {
            ListenerInner::Tcp(listener) => {
                let (stream, peer) = listener.accept().await.map_err(TransportError::Accept)?;
                let _ = stream.set_nodelay(true);
                debug!(%peer, "accepted tcp connection");
                SpStream::from_tcp(stream)
            }
            #[cfg(unix)]
            ListenerInner::Unix(listener) => {
                let (stream, _addr) = listener.accept().await.map_err(TransportError::Accept)?;
                debug!("accepted ipc connection");
                SpStream::from_unix(stream)
            }
        };
        match tokio::time::timeout(
            self.handshake_timeout,
            exchange_headers(&mut stream, self.protocol),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(TransportError::Timeout {
                    address: self.address.to_string(),
                    after: self.handshake_timeout,
                })
            }
        }
        Ok(stream)
    }

    /// The bound address, with the actual port for TCP.
    pub fn local_address(&self) -> &Address {
        &self.address
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }
}

#[cfg(unix)]
fn remove_stale_socket(address: &Address, path: &Path) -> Result<()> {
    let bind_error = |source| TransportError::Bind {
        address: address.to_string(),
        source,
    };
    if !path.exists() {
        return Ok(());
    }
    let metadata = std::fs::symlink_metadata(path).map_err(bind_error)?;
    if !metadata.file_type().is_socket() {
        return Err(bind_error(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "existing path is not a unix socket",
        )));
    }
    debug!(?path, "removing stale socket");
    std::fs::remove_file(path).map_err(bind_error)
}

impl SpListener {
    #[cfg(unix)]
    fn cleanup_socket_file(&self) {
        let Some(file) = &self.socket_file else {
            return;
        };
        match std::fs::symlink_metadata(&file.path) {
            Ok(metadata)
                if metadata.file_type().is_socket()
                    && metadata.dev() == file.dev
                    && metadata.ino() == file.ino =>
            {
                debug!(path = ?file.path, "cleaning up socket file");
                let _ = std::fs::remove_file(&file.path);
            }
            Ok(_) => debug!(path = ?file.path, "socket path identity changed; skipping cleanup"),
            Err(_) => {}
        }
    }
}

impl Drop for SpListener {
    fn drop(&mut self) {
        #[cfg(unix)]
        self.cleanup_socket_file();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;
    use crate::dial::dial;
    use crate::stream::Flavor;

    const TIMEOUT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn tcp_dial_and_accept() {
        let listener = SpListener::bind(&Address::tcp("127.0.0.1", 0), Protocol::Rep0)
            .await
            .expect("listener should bind");
        let address = listener.local_address().clone();
        assert!(matches!(address, Address::Tcp { port, .. } if port != 0));

        let server = tokio::spawn(async move {
            let mut stream = listener.accept().await.expect("accept should succeed");
            let mut buf = [0u8; 5];
            stream.read_exact(&mut buf).await.expect("read");
            buf
        });

        let mut client = dial(&address, Protocol::Req0, TIMEOUT)
            .await
            .expect("dial should succeed");
        assert_eq!(client.flavor(), Flavor::Tcp);
        client.write_all(b"hello").await.expect("write");

        assert_eq!(&server.await.expect("join"), b"hello");
    }

    #[tokio::test]
    async fn dial_rejects_wrong_protocol() {
        let listener = SpListener::bind(&Address::tcp("127.0.0.1", 0), Protocol::Pub0)
            .await
            .expect("listener should bind");
        let address = listener.local_address().clone();
        let server = tokio::spawn(async move { listener.accept().await.map(|_| ()) });

        let result = dial(&address, Protocol::Req0, TIMEOUT).await;
        assert!(matches!(result, Err(TransportError::Handshake(_))));
        assert!(server.await.expect("join").is_err());
    }

    #[tokio::test]
    async fn dial_refused_reports_connect_error() {
        let listener = SpListener::bind(&Address::tcp("127.0.0.1", 0), Protocol::Rep0)
            .await
            .expect("listener should bind");
        let address = listener.local_address().clone();
        drop(listener);

        let result = dial(&address, Protocol::Req0, TIMEOUT).await;
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }

    #[tokio::test]
    async fn dial_times_out_when_peer_never_answers() {
        // A raw listener accepts the TCP connection but never sends a header.
        let raw = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = raw.local_addr().expect("addr").port();
        let _hold = tokio::spawn(async move {
            let (stream, _) = raw.accept().await.expect("accept");
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(stream);
        });

        let result = dial(
            &Address::tcp("127.0.0.1", port),
            Protocol::Sub0,
            Duration::from_millis(100),
        )
        .await;
        let err = result.expect_err("dial should time out");
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn accept_drops_silent_peer_after_handshake_timeout() {
        let listener = SpListener::bind(&Address::tcp("127.0.0.1", 0), Protocol::Pub0)
            .await
            .expect("listener should bind")
            .with_handshake_timeout(Duration::from_millis(100));
        let address = listener.local_address().clone();
        let Address::Tcp { port, .. } = address else {
            panic!("tcp listener");
        };

        // Connects but never writes a header.
        let _silent = tokio::net::TcpStream::connect(("127.0.0.1", port))
            .await
            .expect("raw connect");
        let err = tokio::time::timeout(TIMEOUT, listener.accept())
            .await
            .expect("accept must not hang")
            .expect_err("silent peer should time out");
        assert!(err.is_timeout(), "got {err:?}");

        let server = tokio::spawn(async move { listener.accept().await.map(|_| ()) });
        dial(&address, Protocol::Sub0, TIMEOUT)
            .await
            .expect("a well-behaved peer still connects");
        server.await.expect("join").expect("accept after timeout");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn ipc_dial_accept_and_cleanup() {
        let dir = std::env::temp_dir().join(format!("amiga-transport-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        let sock_path = dir.join("hal.sock");
        let address = Address::ipc(&sock_path);

        let listener = SpListener::bind(&address, Protocol::Pub0)
            .await
            .expect("ipc listener should bind");
        assert!(sock_path.exists());

        let server = tokio::spawn(async move {
            let stream = listener.accept().await.expect("accept");
            (listener, stream)
        });

        let client = dial(&address, Protocol::Sub0, TIMEOUT)
            .await
            .expect("ipc dial should succeed");
        assert_eq!(client.flavor(), Flavor::Ipc);

        let (listener, _stream) = server.await.expect("join");
        drop(listener);
        assert!(
            !sock_path.exists(),
            "socket file should be cleaned up on drop"
        );
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn ipc_bind_rejects_existing_non_socket_file() {
        let dir = std::env::temp_dir().join(format!("amiga-bind-file-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        let sock_path = dir.join("not-a-socket.sock");
        std::fs::write(&sock_path, b"regular-file").expect("write file");

        let result = SpListener::bind(&Address::ipc(&sock_path), Protocol::Pub0).await;
        assert!(matches!(result, Err(TransportError::Bind { .. })));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
