//! Fuzz target for IRC message parsing
//!
//! Feeds arbitrary text to the parser and checks that it never panics and
//! that whatever it produces serializes to a single line.

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::str;

use ircflow::encode::IrcEncode;
use ircflow::Message;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = str::from_utf8(data) {
        let message = Message::parse(input);

        let wire = message.to_bytes();
        assert!(wire.ends_with(b"\r\n"));
        assert!(!wire[..wire.len() - 2].contains(&b'\n'));
    }
});
