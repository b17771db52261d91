//! # ircflow
//!
//! A small reactive IRC client core.
//!
//! ## Features
//!
//! - Line framing that survives arbitrarily fragmented reads
//! - A permissive parser that never rejects a line
//! - Wire encoding with the last parameter always in trailing form
//! - A Tokio client that registers on connect, answers `PING`, and fans
//!   inbound messages out to independent subscribers
//! - Command-filtered and per-channel message streams

#![deny(clippy::all)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! ## Quick Start
//!
//! ### Parsing and building messages
//!
//! ```rust
//! use ircflow::Message;
//!
//! let msg = Message::parse(":nick!user@host PRIVMSG #channel :Hello!");
//! assert_eq!(msg.command, "PRIVMSG");
//! assert_eq!(msg.source_nickname(), Some("nick"));
//!
//! let reply = Message::privmsg("#channel", "Hi");
//! assert_eq!(reply.to_string(), "PRIVMSG #channel :Hi");
//! ```
//!
//! ### Running a client
//!
//! ```no_run
//! use futures_util::StreamExt;
//! use ircflow::{Client, Config, TcpConnector};
//!
//! # #[tokio::main]
//! # async fn main() -> ircflow::error::Result<()> {
//! let client = Client::new(Config::new("irc.libera.chat", 6667, "flowbot", "flowbot", "Flow Bot"));
//! let channel = client.channel("#ircflow");
//! let mut chatter = channel.messages();
//!
//! let driver = client.connect(TcpConnector)?;
//! channel.join()?;
//!
//! while let Some(Ok(msg)) = chatter.next().await {
//!     if msg.command == "PRIVMSG" && msg.params.get(1).map(String::as_str) == Some("!quit") {
//!         client.quit();
//!     }
//! }
//! let _ = driver.await;
//! # Ok(())
//! # }
//! ```

pub mod casemap;
pub mod config;
pub mod encode;
pub mod error;
pub mod line;
pub mod message;
pub mod prefix;
pub mod state;

#[cfg(feature = "tokio")]
pub mod broadcast;
#[cfg(feature = "tokio")]
pub mod channel;
#[cfg(feature = "tokio")]
pub mod client;
#[cfg(feature = "tokio")]
pub mod transport;

pub use self::casemap::{irc_eq, irc_to_lower};
pub use self::config::Config;
pub use self::error::{ProtocolError, Result};
pub use self::line::LineTransformer;
pub use self::message::Message;
pub use self::prefix::Prefix;
pub use self::state::{ConnectionState, Session};

#[cfg(feature = "tokio")]
pub use self::broadcast::{Broadcast, Subscription};
#[cfg(feature = "tokio")]
pub use self::channel::Channel;
#[cfg(feature = "tokio")]
pub use self::client::{Client, MessageSink, Outbound};
#[cfg(feature = "tokio")]
pub use self::transport::{Connector, Preconnected, TcpConnector};
