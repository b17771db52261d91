//! IRC message representation, parsing and display.

mod parse;
mod types;

pub use self::parse::parse_message;
pub use self::types::Message;
