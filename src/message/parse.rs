//! Permissive IRC line parser.
//!
//! The parser is built from small `nom` scanners that thread the remaining
//! input forward, so each step only ever looks at what is left of the line.
//! It never fails: malformed lines degrade to a partial [`Message`].

use nom::{
    bytes::complete::{take_till, take_while},
    character::complete::char,
    combinator::{opt, rest},
    sequence::preceded,
    IResult,
};

use super::Message;

type ParseResult<'a, O> = IResult<&'a str, O>;

/// A run of non-space characters, possibly empty.
fn token(input: &str) -> ParseResult<'_, &str> {
    take_till(|c| c == ' ')(input)
}

fn spaces(input: &str) -> ParseResult<'_, &str> {
    take_while(|c| c == ' ')(input)
}

/// `:prefix`, without the colon.
fn prefix(input: &str) -> ParseResult<'_, &str> {
    preceded(char(':'), token)(input)
}

/// `:trailing parameter`, taken verbatim to the end of the line.
fn trailing(input: &str) -> ParseResult<'_, &str> {
    preceded(char(':'), rest)(input)
}

fn params(mut input: &str) -> ParseResult<'_, Vec<&str>> {
    let mut params = Vec::new();
    loop {
        let (remaining, _) = spaces(input)?;
        if remaining.is_empty() {
            return Ok((remaining, params));
        }
        if let Ok((remaining, last)) = trailing(remaining) {
            params.push(last);
            return Ok((remaining, params));
        }
        let (remaining, param) = token(remaining)?;
        params.push(param);
        input = remaining;
    }
}

fn message(input: &str) -> ParseResult<'_, Message> {
    let (input, source) = opt(prefix)(input)?;
    let source = source.map(str::to_owned);

    let input = if source.is_some() {
        if input.is_empty() {
            let msg = Message {
                prefix: source,
                ..Message::default()
            };
            return Ok((input, msg));
        }
        spaces(input)?.0
    } else {
        input
    };

    let (input, command) = token(input)?;
    let (input, params) = if input.is_empty() {
        (input, Vec::new())
    } else {
        params(input)?
    };

    Ok((
        input,
        Message {
            prefix: source,
            command: command.to_owned(),
            params: params.into_iter().map(str::to_owned).collect(),
        },
    ))
}

/// Parse one protocol line into a [`Message`].
///
/// ```text
/// [':' prefix SP] command [SP param]* [SP ':' trailing]
/// ```
///
/// A line terminator left on the input is ignored. Quirks kept on purpose:
/// - a prefix with nothing after it yields an empty command;
/// - a blank line yields an empty command and no parameters;
/// - runs of spaces between tokens collapse, but a trailing parameter is
///   taken byte for byte.
pub fn parse_message(line: &str) -> Message {
    let line = line.trim_end_matches(['\r', '\n']);
    match message(line) {
        Ok((_, msg)) => msg,
        Err(_) => Message::default(),
    }
}
