//! IRC message prefix (source) types.

use std::fmt;

/// The sender of a message, split into its parts.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Prefix {
    /// A server name such as `irc.example.org`.
    ServerName(String),
    /// `nickname!username@hostname`; missing parts are empty.
    Nickname(String, String, String),
}

impl Prefix {
    /// Split a raw prefix (without the leading `:`).
    ///
    /// A prefix containing a `.` but neither `!` nor `@` names a server;
    /// anything else names a user.
    pub fn parse(s: &str) -> Self {
        if s.contains('.') && !s.contains(['!', '@']) {
            return Prefix::ServerName(s.to_owned());
        }

        let (nick, rest) = match s.find(['!', '@']) {
            Some(i) => s.split_at(i),
            None => (s, ""),
        };
        let (user, host) = match rest.strip_prefix('!') {
            Some(rest) => rest.split_once('@').unwrap_or((rest, "")),
            None => ("", rest.strip_prefix('@').unwrap_or("")),
        };

        Prefix::Nickname(nick.to_owned(), user.to_owned(), host.to_owned())
    }

    /// The nickname, when this prefix names a user.
    pub fn nickname(&self) -> Option<&str> {
        match self {
            Prefix::Nickname(nick, _, _) => Some(nick),
            Prefix::ServerName(_) => None,
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::ServerName(name) => f.write_str(name),
            Prefix::Nickname(nick, user, host) => {
                f.write_str(nick)?;
                if !user.is_empty() {
                    write!(f, "!{}", user)?;
                }
                if !host.is_empty() {
                    write!(f, "@{}", host)?;
                }
                Ok(())
            }
        }
    }
}
