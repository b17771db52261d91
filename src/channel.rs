//! Per-channel view over a client connection.

use crate::broadcast::Subscription;
use crate::casemap::irc_eq;
use crate::client::Client;
use crate::error::Result;
use crate::message::Message;

/// A channel on a [`Client`]'s connection.
///
/// The view holds no state of its own: [`messages`](Self::messages) is a
/// filter over the client's inbound stream, and the send helpers go
/// through the client's outgoing queue.
#[derive(Clone, Debug)]
pub struct Channel {
    client: Client,
    name: String,
}

impl Channel {
    /// View `name` on `client`.
    pub fn new(client: &Client, name: impl Into<String>) -> Self {
        Self {
            client: client.clone(),
            name: name.into(),
        }
    }

    /// The channel name as given.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether `msg` concerns this channel: its first parameter names the
    /// channel, compared case-insensitively.
    pub fn is_addressed(&self, msg: &Message) -> bool {
        addressed_to(msg, &self.name)
    }

    /// Inbound messages concerning this channel.
    pub fn messages(&self) -> Subscription<Message> {
        let name = self.name.clone();
        self.client.filtered(move |msg| addressed_to(msg, &name))
    }

    /// `JOIN` the channel.
    pub fn join(&self) -> Result<()> {
        self.client.send(Message::join(&self.name))
    }

    /// `PART` the channel, optionally with a reason.
    pub fn part(&self, reason: Option<&str>) -> Result<()> {
        self.client.send(Message::part(&self.name, reason))
    }

    /// `PRIVMSG` the channel.
    pub fn send_message(&self, text: impl Into<String>) -> Result<()> {
        self.client.send(Message::privmsg(&self.name, text))
    }
}

fn addressed_to(msg: &Message, channel: &str) -> bool {
    msg.target().is_some_and(|target| irc_eq(target, channel))
}
