//! Fuzz target for line framing
//!
//! Splits the input at a fuzzer-chosen point and checks that framing the
//! two halves yields the same lines as framing the whole.

#![no_main]

use libfuzzer_sys::fuzz_target;

use ircflow::LineTransformer;

fuzz_target!(|data: &[u8]| {
    let Some((&split, payload)) = data.split_first() else {
        return;
    };
    let split = usize::from(split).min(payload.len());

    // Chunking invariance is checked without the length cap in the way.
    let mut whole = LineTransformer::new().with_max_line_len(usize::MAX);
    let expected = whole.push(payload).unwrap();

    let mut halves = LineTransformer::new().with_max_line_len(usize::MAX);
    let mut lines = halves.push(&payload[..split]).unwrap();
    lines.extend(halves.push(&payload[split..]).unwrap());

    assert_eq!(lines, expected);
    assert_eq!(halves.pending(), whole.pending());
});
