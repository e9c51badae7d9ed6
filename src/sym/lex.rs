//! Tokenizing symbol-file records.
//!
//! Label and inspection files are whitespace-delimited, one record per line.
//! This module holds the [`Token`] enum the record parsers in [`sym`] consume.
//! The fixed-column listing format is not tokenized here; it is column-sliced
//! by [`sym::parse_listing`] directly.
//!
//! [`sym`]: crate::sym
//! [`sym::parse_listing`]: crate::sym::parse_listing

use logos::Logos;

/// A unit of information in a symbol-file record.
#[derive(Debug, Logos, PartialEq, Eq)]
#[logos(skip r"[ \t\r]+")]
pub(crate) enum Token {
    // Note, the Addr/Word regexes span over tokens that are technically
    // invalid (e.g., `$XYZ` matches Addr even though XYZ is not hex).
    // This is intended: a field is collected as one discernable unit and
    // the record parser validates it, recovering with a warning on bad hex.

    /// The `=` separator of a `NAME = $ADDR` label record.
    #[token("=")]
    Equals,

    /// A `$`-prefixed address field (e.g. `$C000`), with the sigil stripped.
    #[regex(r"\$\S*", |lx| lx.slice()[1..].to_string())]
    Addr(String),

    /// Any other whitespace-delimited field: a name, or a bare hex value.
    #[regex(r"[^\s=$]\S*", |lx| lx.slice().to_string())]
    Word(String),
}

impl Token {
    /// The text of this token if it may serve as a hexadecimal field.
    ///
    /// Both bare fields (`C000`) and `$`-prefixed fields (`$C000`) qualify;
    /// whether the text actually parses as hex is the record parser's call.
    pub(crate) fn hex_text(&self) -> Option<&str> {
        match self {
            Token::Addr(s) | Token::Word(s) => Some(s),
            Token::Equals => None,
        }
    }
}
