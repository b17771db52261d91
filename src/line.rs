//! Byte-stream to line framing.
//!
//! Network reads arrive in chunks that bear no relation to line boundaries.
//! [`LineTransformer`] accumulates them and hands back every line a chunk
//! completes, with the `\n` or `\r\n` terminator stripped.
//!
//! ```
//! use ircflow::line::LineTransformer;
//!
//! let mut lines = LineTransformer::new();
//! assert!(lines.push(b"PING :irc.exa")?.is_empty());
//! assert_eq!(lines.push(b"mple.com\r\nPING :again\r")?, vec!["PING :irc.example.com"]);
//! assert_eq!(lines.push(b"\n")?, vec!["PING :again"]);
//! # Ok::<(), ircflow::ProtocolError>(())
//! ```

use bytes::BytesMut;
use encoding::{Encoding, UTF_8};

use crate::error::{ProtocolError, Result};

/// Default maximum line length in bytes, terminator excluded.
///
/// Generous enough for IRCv3 message tags (8191 bytes on the wire).
pub const MAX_LINE_LEN: usize = 8191;

/// Look up a WHATWG encoding label usable for IRC lines.
///
/// Only ASCII-compatible encodings qualify; the others cannot be framed
/// on the `\n` byte.
pub(crate) fn encoding_for_label(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.as_bytes())
        .filter(|encoding| encoding.is_ascii_compatible())
        .ok_or_else(|| ProtocolError::UnknownEncoding(label.to_owned()))
}

/// Incremental line splitter.
///
/// The unterminated tail of the input is kept as raw bytes, so a
/// multi-byte character split across two reads decodes correctly once its
/// line completes. Everything pushed so far equals the lines already
/// returned (with terminators) followed by [`pending`](Self::pending).
#[derive(Debug)]
pub struct LineTransformer {
    incomplete: BytesMut,
    encoding: &'static Encoding,
    max_line_len: usize,
}

impl Default for LineTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineTransformer {
    /// Create a transformer decoding UTF-8.
    pub fn new() -> Self {
        Self::with_encoding_static(UTF_8)
    }

    /// Create a transformer decoding the encoding named by `label`
    /// (a WHATWG label such as `"utf-8"` or `"latin1"`).
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UnknownEncoding`] if the label is unknown or names
    /// an encoding that is not ASCII-compatible.
    pub fn with_encoding(label: &str) -> Result<Self> {
        Ok(Self::with_encoding_static(encoding_for_label(label)?))
    }

    pub(crate) fn with_encoding_static(encoding: &'static Encoding) -> Self {
        Self {
            incomplete: BytesMut::with_capacity(512),
            encoding,
            max_line_len: MAX_LINE_LEN,
        }
    }

    /// Set the longest line accepted, in bytes, terminator excluded.
    #[must_use]
    pub fn with_max_line_len(mut self, max_line_len: usize) -> Self {
        self.max_line_len = max_line_len;
        self
    }

    /// The encoding lines are decoded with.
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// The longest line accepted, in bytes.
    pub fn max_line_len(&self) -> usize {
        self.max_line_len
    }

    /// Bytes received since the last terminator.
    pub fn pending(&self) -> &[u8] {
        &self.incomplete
    }

    /// Feed one chunk and return the lines it completed, in order.
    ///
    /// An empty chunk, or one without a terminator, returns no lines.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::LineTooLong`] once a line, complete or not, exceeds
    /// the maximum length. The buffered input is discarded.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        self.push_into(chunk, &mut lines)?;
        Ok(lines)
    }

    /// Like [`push`](Self::push), but lines completed before an overflow
    /// are kept in `lines`.
    fn push_into(&mut self, chunk: &[u8], lines: &mut Vec<String>) -> Result<()> {
        if chunk.is_empty() {
            return Ok(());
        }

        // Only the new bytes can hold a terminator the tail did not have.
        let searched = self.incomplete.len();
        self.incomplete.extend_from_slice(chunk);

        let mut from = searched;
        while let Some(offset) = self.incomplete[from..].iter().position(|&b| b == b'\n') {
            let line = self.incomplete.split_to(from + offset + 1);
            let content = strip_terminator(&line);
            if content.len() > self.max_line_len {
                return Err(self.overflow(content.len()));
            }
            lines.push(self.decode(content));
            from = 0;
        }

        // A trailing `\r` may still turn out to be part of the terminator.
        let buffered = &self.incomplete[..];
        let tail = buffered.strip_suffix(b"\r").unwrap_or(buffered).len();
        if tail > self.max_line_len {
            return Err(self.overflow(tail));
        }
        Ok(())
    }

    fn overflow(&mut self, len: usize) -> ProtocolError {
        self.incomplete.clear();
        ProtocolError::LineTooLong(len)
    }

    fn decode(&self, line: &[u8]) -> String {
        let (text, _malformed) = self.encoding.decode_without_bom_handling(line);
        text.into_owned()
    }

    /// Turn a stream of byte chunks into a stream of lines.
    ///
    /// Lines are yielded as soon as the chunk completing them arrives. A
    /// chunk error, or a line overflowing the maximum length, is yielded
    /// in position after the lines completed before it.
    #[cfg(feature = "tokio")]
    pub fn lines<S, B, E>(self, chunks: S) -> impl futures_util::Stream<Item = Result<String>>
    where
        S: futures_util::Stream<Item = std::result::Result<B, E>>,
        B: AsRef<[u8]>,
        ProtocolError: From<E>,
    {
        use futures_util::{stream, StreamExt};

        let mut transformer = self;
        chunks.flat_map(move |chunk| {
            let mut lines = Vec::new();
            let outcome = match chunk {
                Ok(bytes) => transformer.push_into(bytes.as_ref(), &mut lines),
                Err(e) => Err(ProtocolError::from(e)),
            };
            let mut items: Vec<Result<String>> = lines.into_iter().map(Ok).collect();
            if let Err(e) = outcome {
                items.push(Err(e));
            }
            stream::iter(items)
        })
    }
}

fn strip_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
