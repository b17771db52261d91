//! The owned IRC message type.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::prefix::Prefix;

/// A single IRC protocol line in structured form.
///
/// Messages are plain values: they compare structurally and carry no
/// identity. Inbound messages come from [`Message::parse`]; outbound ones
/// are built by callers, usually through the constructors below.
///
/// ```
/// use ircflow::Message;
///
/// let msg = Message::parse(":nick!user@host PRIVMSG #chan :hello world");
/// assert_eq!(msg.prefix.as_deref(), Some("nick!user@host"));
/// assert_eq!(msg.command, "PRIVMSG");
/// assert_eq!(msg.params, vec!["#chan", "hello world"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    /// Sender annotation, without the leading `:`.
    pub prefix: Option<String>,
    /// Command name or three-digit numeric. Empty when the line had none.
    pub command: String,
    /// Parameters in encounter order, trailing parameter included.
    pub params: Vec<String>,
}

impl Message {
    /// Build a message from a command and its parameters.
    pub fn new<C, I, P>(command: C, params: I) -> Self
    where
        C: Into<String>,
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            prefix: None,
            command: command.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a protocol line. See [`parse_message`](crate::message::parse_message).
    pub fn parse(line: &str) -> Self {
        super::parse::parse_message(line)
    }

    /// Attach a prefix to the message.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// `PRIVMSG target :text`
    pub fn privmsg(target: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new("PRIVMSG", [target.into(), text.into()])
    }

    /// `NOTICE target :text`
    pub fn notice(target: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new("NOTICE", [target.into(), text.into()])
    }

    /// `JOIN :channel`
    pub fn join(channel: impl Into<String>) -> Self {
        Self::new("JOIN", [channel.into()])
    }

    /// `PART channel [:reason]`
    pub fn part(channel: impl Into<String>, reason: Option<&str>) -> Self {
        let mut params = vec![channel.into()];
        params.extend(reason.map(str::to_owned));
        Self::new("PART", params)
    }

    /// `NICK :nickname`
    pub fn nick(nickname: impl Into<String>) -> Self {
        Self::new("NICK", [nickname.into()])
    }

    /// `USER username . . :realname`
    ///
    /// The two middle fields are unused by modern servers and always sent
    /// as `.`.
    pub fn user(username: impl Into<String>, realname: impl Into<String>) -> Self {
        Self::new(
            "USER",
            [username.into(), ".".to_owned(), ".".to_owned(), realname.into()],
        )
    }

    /// `PING :token`
    pub fn ping(token: impl Into<String>) -> Self {
        Self::new("PING", [token.into()])
    }

    /// `PONG` echoing the given parameters.
    pub fn pong<I, P>(params: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self::new("PONG", params)
    }

    /// `QUIT :reason`
    pub fn quit(reason: impl Into<String>) -> Self {
        Self::new("QUIT", [reason.into()])
    }

    /// Structured view of the prefix, if one is present.
    pub fn source(&self) -> Option<Prefix> {
        self.prefix.as_deref().map(Prefix::parse)
    }

    /// Nickname of the sender when the prefix names a user.
    pub fn source_nickname(&self) -> Option<&str> {
        let prefix = self.prefix.as_deref()?;
        match Prefix::parse(prefix) {
            Prefix::Nickname(..) => prefix.split(['!', '@']).next(),
            Prefix::ServerName(_) => None,
        }
    }

    /// First parameter, which for most commands is the target.
    pub fn target(&self) -> Option<&str> {
        self.params.first().map(String::as_str)
    }
}

/// Formats the message as it goes on the wire, minus the `\r\n`.
///
/// The last parameter is always written in trailing form. A parameter that
/// would not parse back as a middle parameter starts the trailing part
/// early, so the line still frames as one message. Parameters and the
/// prefix are cut at the first CR, LF or NUL.
impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, ":{} ", crate::encode::line_safe(prefix))?;
        }
        f.write_str(crate::encode::line_safe(&self.command))?;

        let Some(split) = crate::encode::trailing_index(&self.params) else {
            return Ok(());
        };
        let (middle, trailing) = self.params.split_at(split);
        for param in middle {
            write!(f, " {}", crate::encode::line_safe(param))?;
        }
        f.write_str(" :")?;
        for (i, param) in trailing.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(crate::encode::line_safe(param))?;
        }
        Ok(())
    }
}

impl FromStr for Message {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for Message {
    fn from(line: &str) -> Self {
        Self::parse(line)
    }
}
