//! Transport boundary.
//!
//! The client never opens sockets by itself. It is handed a [`Connector`]
//! that produces a duplex byte stream for a host and port; the client then
//! derives the lifecycle signals from that stream (resolved connect, EOF,
//! I/O error).

use std::io;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::warn;

/// Opens the byte stream a client runs over.
pub trait Connector: Send + Sync + 'static {
    /// The duplex stream produced on success.
    type Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    /// Open a connection to `hostname:port`.
    fn connect<'a>(&'a self, hostname: &'a str, port: u16) -> BoxFuture<'a, io::Result<Self::Stream>>;
}

/// Plain TCP with keepalive probes enabled.
#[derive(Clone, Debug, Default)]
pub struct TcpConnector;

impl TcpConnector {
    fn enable_keepalive(stream: &TcpStream) -> io::Result<()> {
        use socket2::{SockRef, TcpKeepalive};

        let sock = SockRef::from(stream);
        let keepalive = TcpKeepalive::new()
            .with_time(Duration::from_secs(120))
            .with_interval(Duration::from_secs(30));

        sock.set_tcp_keepalive(&keepalive)
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    fn connect<'a>(&'a self, hostname: &'a str, port: u16) -> BoxFuture<'a, io::Result<TcpStream>> {
        Box::pin(async move {
            let stream = TcpStream::connect((hostname, port)).await?;
            if let Err(e) = Self::enable_keepalive(&stream) {
                warn!("failed to enable TCP keepalive: {}", e);
            }
            Ok(stream)
        })
    }
}

/// Hands out a stream the caller has already opened, once.
///
/// Useful for streams the client cannot dial itself (a proxy tunnel, a
/// TLS session set up elsewhere, an in-memory pipe). The host and port
/// passed to `connect` are ignored.
#[derive(Debug)]
pub struct Preconnected<S> {
    stream: Mutex<Option<S>>,
}

impl<S> Preconnected<S> {
    /// Wrap an open stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream: Mutex::new(Some(stream)),
        }
    }
}

impl<S> Connector for Preconnected<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    type Stream = S;

    fn connect<'a>(&'a self, _hostname: &'a str, _port: u16) -> BoxFuture<'a, io::Result<S>> {
        let stream = self
            .stream
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Box::pin(async move {
            stream.ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "stream already taken"))
        })
    }
}
