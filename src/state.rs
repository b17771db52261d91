//! Sans-IO session state machine.
//!
//! [`Session`] performs no I/O. The connection driver feeds it lifecycle
//! signals and parsed inbound messages; it answers with the messages that
//! must be written in response and tracks the connection state.
//!
//! # Example
//!
//! ```
//! use ircflow::state::{ConnectionState, Session};
//! use ircflow::{Config, Message};
//!
//! let config = Config::new("irc.example.org", 6667, "bot", "bot", "A Bot");
//! let mut session = Session::new(&config);
//!
//! session.start();
//! let handshake = session.on_lifecycle(true);
//! assert_eq!(handshake[0].command, "USER");
//! assert_eq!(handshake[1].command, "NICK");
//! assert_eq!(session.state(), ConnectionState::Connected);
//!
//! let pong = session.feed(&Message::parse("PING :abc"));
//! assert_eq!(pong, Some(Message::pong(["abc"])));
//! ```

use crate::config::Config;
use crate::message::Message;

/// Lifecycle of one connection attempt. There is no way back: a
/// terminated session stays terminated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConnectionState {
    /// Nothing has happened yet.
    #[default]
    Idle,
    /// The transport has been asked to connect.
    Connecting,
    /// The transport is up and the handshake has been sent.
    Connected,
    /// The inbound stream completed or failed.
    Terminated,
}

/// Protocol handlers that react to lifecycle and inbound traffic.
#[derive(Clone, Debug)]
pub struct Session {
    nick: String,
    username: String,
    real_name: String,
    state: ConnectionState,
}

impl Session {
    /// Create a session registering with the identity in `config`.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            nick: config.nick.clone(),
            username: config.username.clone(),
            real_name: config.real_name.clone(),
            state: ConnectionState::Idle,
        }
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Record that the transport has been asked to connect.
    pub fn start(&mut self) {
        if self.state == ConnectionState::Idle {
            self.state = ConnectionState::Connecting;
        }
    }

    /// Handle a lifecycle signal.
    ///
    /// The first `true` yields the handshake, `USER` then `NICK`. Repeated
    /// signals, `false`, and signals after termination yield nothing.
    #[must_use]
    pub fn on_lifecycle(&mut self, connected: bool) -> Vec<Message> {
        let ready = matches!(
            self.state,
            ConnectionState::Idle | ConnectionState::Connecting
        );
        if !connected || !ready {
            return Vec::new();
        }

        self.state = ConnectionState::Connected;
        vec![
            Message::user(&self.username, &self.real_name),
            Message::nick(&self.nick),
        ]
    }

    /// Handle one inbound message; returns the automatic reply, if any.
    ///
    /// Only `PING` is answered, with a `PONG` echoing its parameters.
    #[must_use]
    pub fn feed(&mut self, msg: &Message) -> Option<Message> {
        (msg.command == "PING").then(|| Message::pong(msg.params.iter().cloned()))
    }

    /// Record that the inbound stream ended, cleanly or not.
    pub fn terminate(&mut self) {
        self.state = ConnectionState::Terminated;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(&Config::new("irc.example.org", 6667, "bot", "botuser", "Bot Name"))
    }

    #[test]
    fn test_initial_state() {
        assert_eq!(session().state(), ConnectionState::Idle);
    }

    #[test]
    fn test_handshake_order_and_content() {
        let mut s = session();
        s.start();
        assert_eq!(s.state(), ConnectionState::Connecting);

        let sent = s.on_lifecycle(true);
        assert_eq!(
            sent,
            vec![
                Message::new("USER", ["botuser", ".", ".", "Bot Name"]),
                Message::new("NICK", ["bot"]),
            ]
        );
        assert_eq!(s.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_handshake_sent_once() {
        let mut s = session();
        s.start();
        assert_eq!(s.on_lifecycle(true).len(), 2);
        assert!(s.on_lifecycle(true).is_empty());
        assert!(s.on_lifecycle(true).is_empty());
    }

    #[test]
    fn test_false_signal_does_nothing() {
        let mut s = session();
        s.start();
        assert!(s.on_lifecycle(false).is_empty());
        assert_eq!(s.state(), ConnectionState::Connecting);
        assert_eq!(s.on_lifecycle(true).len(), 2);
    }

    #[test]
    fn test_no_handshake_after_termination() {
        let mut s = session();
        s.start();
        s.terminate();
        assert!(s.on_lifecycle(true).is_empty());
        assert_eq!(s.state(), ConnectionState::Terminated);
    }

    #[test]
    fn test_ping_answered_with_same_params() {
        let mut s = session();
        let reply = s.feed(&Message::new("PING", ["abc"]));
        assert_eq!(reply, Some(Message::new("PONG", ["abc"])));

        let reply = s.feed(&Message::parse("PING tok1 :tok 2"));
        assert_eq!(reply, Some(Message::new("PONG", ["tok1", "tok 2"])));
    }

    #[test]
    fn test_other_commands_not_answered() {
        let mut s = session();
        assert!(s.feed(&Message::parse("PONG :abc")).is_none());
        assert!(s.feed(&Message::parse("ping :lowercase")).is_none());
        assert!(s.feed(&Message::parse(":a PRIVMSG #b :PING")).is_none());
    }
}
