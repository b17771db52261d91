//! The protocol client.
//!
//! A [`Client`] ties a transport, the line transformer, the parser and a
//! [`Session`] together:
//!
//! ```text
//! transport ─► LineTransformer ─► parse ─► Session (PONG) ─► Broadcast ─► subscribers
//!                                                                       ├► command_stream
//!                                                                       └► Channel::messages
//! send / Channel / Session ─► Outbound queue ─► writer task ─► transport
//! ```
//!
//! One driver task owns the read half, the line buffer and the session,
//! so inbound events are handled strictly one after another.

mod outbound;

pub use self::outbound::{MessageSink, Outbound};

use std::pin::pin;
use std::sync::{Arc, Mutex, PoisonError};

use encoding::{Encoding, UTF_8};
use futures_util::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, trace, warn};

use crate::broadcast::{Broadcast, Subscription};
use crate::channel::Channel;
use crate::config::Config;
use crate::error::{ProtocolError, Result};
use crate::line::{encoding_for_label, LineTransformer};
use crate::message::Message;
use crate::state::{ConnectionState, Session};
use crate::transport::Connector;

use self::outbound::{write_loop, Outgoing};

struct Inner {
    config: Config,
    encoding: &'static Encoding,
    inbound: Broadcast<Message>,
    outbound: Outbound,
    queue: Mutex<Option<mpsc::UnboundedReceiver<Outgoing>>>,
    state: watch::Sender<ConnectionState>,
}

/// An IRC client connection.
///
/// `Client` is a cheap handle; clones share the same connection.
///
/// ```no_run
/// use futures_util::StreamExt;
/// use ircflow::{Client, Config, TcpConnector};
///
/// # async fn run() -> ircflow::error::Result<()> {
/// let client = Client::new(Config::new("irc.libera.chat", 6667, "ircflow", "ircflow", "ircflow bot"));
/// let mut privmsgs = client.command_stream("PRIVMSG");
/// client.connect(TcpConnector)?;
///
/// let rust = client.channel("#rust");
/// rust.join()?;
/// while let Some(Ok(msg)) = privmsgs.next().await {
///     println!("{}", msg);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("address", &self.inner.config.address())
            .field("state", &self.state())
            .finish()
    }
}

impl Client {
    /// Create an idle client speaking UTF-8.
    pub fn new(config: Config) -> Self {
        Self::build(config, UTF_8)
    }

    /// Create an idle client speaking the encoding named by `label`.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UnknownEncoding`] if the label is unknown or names
    /// an encoding that is not ASCII-compatible.
    pub fn with_encoding(config: Config, label: &str) -> Result<Self> {
        Ok(Self::build(config, encoding_for_label(label)?))
    }

    fn build(config: Config, encoding: &'static Encoding) -> Self {
        let (outbound, queue) = Outbound::new();
        let (state, _) = watch::channel(ConnectionState::Idle);
        Self {
            inner: Arc::new(Inner {
                config,
                encoding,
                inbound: Broadcast::new(),
                outbound,
                queue: Mutex::new(Some(queue)),
                state,
            }),
        }
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Watch connection state changes.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Wait until the client reaches `Connected` or `Terminated`.
    pub async fn wait_connected(&self) -> ConnectionState {
        let mut rx = self.state_changes();
        let result = rx
            .wait_for(|s| matches!(s, ConnectionState::Connected | ConnectionState::Terminated))
            .await
            .map(|s| *s);
        // The sender lives in `self`, so the wait cannot fail.
        result.unwrap_or(ConnectionState::Terminated)
    }

    /// Open the transport and start the connection driver.
    ///
    /// Returns the driver's handle; it finishes once the inbound stream
    /// has terminated and the outgoing queue has been flushed. Must be
    /// called on a Tokio runtime.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::AlreadyStarted`] if `connect` was called before.
    pub fn connect<C: Connector>(&self, connector: C) -> Result<JoinHandle<()>> {
        let queue = self
            .inner
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(ProtocolError::AlreadyStarted)?;

        let mut session = Session::new(&self.inner.config);
        session.start();
        self.inner.state.send_replace(session.state());

        let inner = Arc::clone(&self.inner);
        Ok(tokio::spawn(drive(inner, connector, session, queue)))
    }

    /// Every inbound message, in arrival order.
    pub fn messages(&self) -> Subscription<Message> {
        self.inner.inbound.subscribe()
    }

    /// Inbound messages whose command equals `command` exactly.
    ///
    /// The match is case-sensitive: servers send commands upper-case and
    /// numerics as digits.
    pub fn command_stream(&self, command: impl Into<String>) -> Subscription<Message> {
        let command = command.into();
        self.inner
            .inbound
            .subscribe_filtered(move |msg: &Message| msg.command == command)
    }

    /// Subscribe to inbound messages matching an arbitrary predicate.
    pub fn filtered<F>(&self, filter: F) -> Subscription<Message>
    where
        F: Fn(&Message) -> bool + Send + Sync + 'static,
    {
        self.inner.inbound.subscribe_filtered(filter)
    }

    /// Queue a message for sending.
    ///
    /// Messages sent before the connection is up are written right after
    /// the handshake.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Closed`] once the client has quit or terminated.
    pub fn send(&self, message: Message) -> Result<()> {
        self.inner.outbound.send(message)
    }

    /// The outgoing sink, for callers that want to drive it directly.
    pub fn sink(&self) -> Outbound {
        self.inner.outbound.clone()
    }

    /// Leave: send `QUIT :Leaving` and close the write side.
    pub fn quit(&self) {
        self.inner.outbound.complete();
    }

    /// A view of `name` on this connection.
    pub fn channel(&self, name: impl Into<String>) -> Channel {
        Channel::new(self, name)
    }
}

async fn drive<C: Connector>(
    inner: Arc<Inner>,
    connector: C,
    mut session: Session,
    queue: mpsc::UnboundedReceiver<Outgoing>,
) {
    let Config { hostname, port, .. } = &inner.config;
    debug!(address = %inner.config.address(), "connecting");

    let stream = match connector.connect(hostname, *port).await {
        Ok(stream) => stream,
        Err(source) => {
            let error = ProtocolError::Connect {
                hostname: hostname.clone(),
                port: *port,
                source,
            };
            warn!(%error, "connection failed");
            session.terminate();
            inner.state.send_replace(session.state());
            inner.outbound.fail(&error);
            inner.inbound.fail(Arc::new(error));
            return;
        }
    };

    // The handshake goes out ahead of anything callers queued earlier.
    let handshake = session.on_lifecycle(true);
    inner.state.send_replace(session.state());

    let (reader, writer) = tokio::io::split(stream);
    let writer = tokio::spawn(write_loop(writer, handshake, queue, inner.encoding));
    info!(address = %inner.config.address(), "connected");

    let transformer = LineTransformer::with_encoding_static(inner.encoding);
    let mut lines = pin!(transformer.lines(ReaderStream::new(reader)));

    let outcome = loop {
        match lines.next().await {
            Some(Ok(line)) => {
                let message = Message::parse(&line);
                if message.command.is_empty() {
                    trace!(line = %line, "dropping line without a command");
                    continue;
                }
                debug!("<< {}", message);

                if let Some(reply) = session.feed(&message) {
                    send_internal(&inner.outbound, reply);
                }
                inner.inbound.publish(&message);
            }
            Some(Err(e)) => break Err(e),
            None => break Ok(()),
        }
    };

    session.terminate();
    inner.state.send_replace(session.state());

    match outcome {
        Ok(()) => {
            info!("connection closed");
            inner.inbound.complete();
            inner.outbound.complete();
        }
        Err(error) => {
            inner.outbound.fail(&error);
            inner.inbound.fail(Arc::new(error));
        }
    }

    if let Err(e) = writer.await {
        warn!(error = %e, "writer task failed");
    }
}

fn send_internal(outbound: &Outbound, message: Message) {
    if let Err(e) = outbound.send(message) {
        debug!(error = %e, "not sent, outbound already closed");
    }
}
