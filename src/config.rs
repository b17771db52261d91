//! Client configuration.

/// Everything needed to reach a server and register with it.
///
/// All fields are required; there are no defaults.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Server host name or address.
    pub hostname: String,
    /// Username (ident) sent in `USER`.
    pub username: String,
    /// Server port.
    pub port: u16,
    /// Nickname sent in `NICK`.
    pub nick: String,
    /// Real name / GECOS sent in `USER`.
    #[cfg_attr(feature = "serde", serde(rename = "realName", alias = "real_name"))]
    pub real_name: String,
}

impl Config {
    /// Build a configuration from its parts.
    pub fn new(
        hostname: impl Into<String>,
        port: u16,
        nick: impl Into<String>,
        username: impl Into<String>,
        real_name: impl Into<String>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            username: username.into(),
            port,
            nick: nick.into(),
            real_name: real_name.into(),
        }
    }

    /// `hostname:port`, for logging.
    pub fn address(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address() {
        let config = Config::new("irc.libera.chat", 6667, "bot", "bot", "A Bot");
        assert_eq!(config.address(), "irc.libera.chat:6667");
        assert_eq!(config.real_name, "A Bot");
    }
}
