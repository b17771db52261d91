//! Outgoing message path: the sink callers write to and the writer task
//! that drains it onto the transport.
//!
//! ```text
//! Client::send ─┐
//! Session      ─┼─► mpsc::UnboundedSender<Outgoing> ─► writer task ─► transport
//! Channel      ─┘
//! ```
//!
//! One FIFO queue feeds one writer, so lines hit the wire in the order
//! they were sent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use encoding::{Encoding, UTF_8};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::encode::IrcEncode;
use crate::error::{ProtocolError, Result};
use crate::message::Message;

/// Receiver of outgoing messages.
///
/// `complete` and `fail` are terminal: they say goodbye to the server and
/// close the write side. Only the first terminal call has any effect.
pub trait MessageSink {
    /// Queue a message for writing.
    fn send(&self, message: Message) -> Result<()>;

    /// Terminal success: send `QUIT :Leaving` and close.
    fn complete(&self);

    /// Terminal failure: send `QUIT :Error` (best effort) and close.
    fn fail(&self, error: &ProtocolError);
}

#[derive(Debug)]
pub(crate) enum Outgoing {
    Message(Message),
    Close,
}

/// Cloneable handle onto a client's outgoing queue.
#[derive(Clone, Debug)]
pub struct Outbound {
    tx: mpsc::UnboundedSender<Outgoing>,
    closed: Arc<AtomicBool>,
}

impl Outbound {
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<Outgoing>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let outbound = Self {
            tx,
            closed: Arc::new(AtomicBool::new(false)),
        };
        (outbound, rx)
    }

    /// Whether a terminal call has been made.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn close_with(&self, reason: &str) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.tx.send(Outgoing::Message(Message::quit(reason)));
        let _ = self.tx.send(Outgoing::Close);
    }
}

impl MessageSink for Outbound {
    fn send(&self, message: Message) -> Result<()> {
        if self.is_closed() {
            return Err(ProtocolError::Closed);
        }
        self.tx
            .send(Outgoing::Message(message))
            .map_err(|_| ProtocolError::Closed)
    }

    fn complete(&self) {
        self.close_with("Leaving");
    }

    fn fail(&self, error: &ProtocolError) {
        warn!(%error, "closing connection after error");
        self.close_with("Error");
    }
}

/// Encode one message as a wire line in `encoding`.
pub(crate) fn encode_line(message: &Message, encoding: &'static Encoding) -> Vec<u8> {
    let bytes = message.to_bytes();
    if encoding == UTF_8 {
        return bytes;
    }
    let text = String::from_utf8_lossy(&bytes);
    encoding.encode(&text).0.into_owned()
}

async fn write_message<W>(writer: &mut W, message: &Message, encoding: &'static Encoding) -> bool
where
    W: AsyncWrite + Unpin,
{
    let line = encode_line(message, encoding);
    if let Err(e) = writer.write_all(&line).await {
        warn!(error = %e, "write failed, dropping outgoing messages");
        return false;
    }
    debug!(">> {}", message);
    true
}

/// Write `prelude`, then drain the queue onto `writer` until `Close`, the
/// queue ends, or a write fails; then shut the writer down.
pub(crate) async fn write_loop<W>(
    mut writer: W,
    prelude: Vec<Message>,
    mut rx: mpsc::UnboundedReceiver<Outgoing>,
    encoding: &'static Encoding,
) where
    W: AsyncWrite + Unpin,
{
    let mut healthy = true;
    for message in &prelude {
        healthy = write_message(&mut writer, message, encoding).await;
        if !healthy {
            break;
        }
    }

    while healthy {
        match rx.recv().await {
            Some(Outgoing::Message(message)) => {
                healthy = write_message(&mut writer, &message, encoding).await;
            }
            Some(Outgoing::Close) | None => break,
        }
    }

    if let Err(e) = writer.shutdown().await {
        debug!(error = %e, "transport shutdown failed");
    }
}
