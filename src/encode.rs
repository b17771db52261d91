//! Wire encoding for outgoing IRC messages.
//!
//! [`IrcEncode`] writes a message straight to any [`Write`] implementor,
//! terminator included, without going through `Display`.
//!
//! # Example
//!
//! ```
//! use ircflow::encode::IrcEncode;
//! use ircflow::Message;
//!
//! let msg = Message::privmsg("#channel", "Hello!");
//! let mut buf = Vec::new();
//! msg.encode(&mut buf).unwrap();
//!
//! assert_eq!(&buf, b"PRIVMSG #channel :Hello!\r\n");
//! ```

use std::io::{self, Write};

use crate::message::Message;

/// A trait for encoding IRC protocol elements directly to a byte stream.
pub trait IrcEncode {
    /// Encode this value to the given writer.
    ///
    /// Returns the number of bytes written on success.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the write fails.
    fn encode<W: Write>(&self, writer: &mut W) -> io::Result<usize>;

    /// Encode this value to a new `Vec<u8>`.
    #[must_use]
    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(512); // IRC max line length
        let _ = self.encode(&mut buf);
        buf
    }
}

/// Cut `s` at the first CR, LF or NUL.
///
/// None of those may appear inside a line, and letting one through would
/// let a parameter smuggle a second command onto the connection.
#[inline]
pub(crate) fn line_safe(s: &str) -> &str {
    match s.find(['\r', '\n', '\0']) {
        Some(end) => &s[..end],
        None => s,
    }
}

/// Index of the parameter written in trailing form, `None` without params.
///
/// That is the last parameter, unless an earlier one could not be read
/// back as a middle parameter (empty, containing a space, or starting with
/// `:`). The trailing part then starts there and the parameters after it
/// follow it, separated by spaces.
pub(crate) fn trailing_index(params: &[String]) -> Option<usize> {
    let last = params.len().checked_sub(1)?;
    let unsafe_middle = params[..last].iter().position(|param| {
        let param = line_safe(param);
        param.is_empty() || param.starts_with(':') || param.contains(' ')
    });
    Some(unsafe_middle.unwrap_or(last))
}

fn write_all_counted<W: Write>(w: &mut W, bytes: &[u8]) -> io::Result<usize> {
    w.write_all(bytes)?;
    Ok(bytes.len())
}

/// Write a command with a freeform (always colon-prefixed) trailing argument.
///
/// See [`trailing_index`] for where the trailing argument starts.
///
/// With no arguments only the command itself is written.
fn write_cmd_freeform<W: Write>(w: &mut W, cmd: &str, args: &[String]) -> io::Result<usize> {
    let mut written = write_all_counted(w, line_safe(cmd).as_bytes())?;

    let Some(split) = trailing_index(args) else {
        return Ok(written);
    };
    let (middle, trailing) = args.split_at(split);

    for arg in middle {
        written += write_all_counted(w, b" ")?;
        written += write_all_counted(w, line_safe(arg).as_bytes())?;
    }

    written += write_all_counted(w, b" :")?;
    for (i, arg) in trailing.iter().enumerate() {
        if i > 0 {
            written += write_all_counted(w, b" ")?;
        }
        written += write_all_counted(w, line_safe(arg).as_bytes())?;
    }
    Ok(written)
}

impl IrcEncode for Message {
    fn encode<W: Write>(&self, w: &mut W) -> io::Result<usize> {
        let mut written = 0;

        if let Some(prefix) = &self.prefix {
            written += write_all_counted(w, b":")?;
            written += write_all_counted(w, line_safe(prefix).as_bytes())?;
            written += write_all_counted(w, b" ")?;
        }

        written += write_cmd_freeform(w, &self.command, &self.params)?;
        written += write_all_counted(w, b"\r\n")?;
        Ok(written)
    }
}
