//! Error types for the IRC client.
//!
//! Parsing never fails, so everything here concerns the connection: the
//! transport, the text encoding, and misuse of a client that has already
//! started or stopped.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Top-level client errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport could not be opened.
    #[error("failed to connect to {hostname}:{port}")]
    Connect {
        /// Host that was dialed.
        hostname: String,
        /// Port that was dialed.
        port: u16,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// No usable text encoding is known under the given label.
    ///
    /// Encodings that are not ASCII-compatible, such as UTF-16, are
    /// rejected too: IRC lines are framed on the `\n` byte.
    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),

    /// An inbound line grew past the maximum length without a terminator.
    #[error("line too long: {0} bytes")]
    LineTooLong(usize),

    /// `connect` was called on a client that is not idle.
    #[error("client already started")]
    AlreadyStarted,

    /// The outbound side has been closed; nothing more can be sent.
    #[error("connection closed")]
    Closed,
}
