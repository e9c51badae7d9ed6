//! Ingesting symbol files into address-resolution tables.
//!
//! The harness understands three kinds of symbol files, each parsed into its
//! own table:
//! - label files ([`parse_labels`] for `NAME = $ADDR` records,
//!   [`parse_labels_flat`] for `ADDR NAME` records), producing [`LabelEntry`]
//!   sequences;
//! - inspection files ([`parse_inspections`]), naming arbitrary memory
//!   windows to dump verbatim ([`InspectionEntry`]);
//! - assembler listings ([`parse_listing`]), correlating addresses with
//!   instruction text and source line numbers ([`Listing`]).
//!
//! Label and listing addresses are relative to the load origin of the binary
//! they describe; the caller threads the origin through explicitly (usually
//! the most recent [`MemoryImage::origin`]). Inspection addresses are
//! absolute.
//!
//! Parsing is best-effort: a field that should be hexadecimal but is not
//! yields a [`ParseWarning`] and the value zero, without dropping the record.
//!
//! [`MemoryImage::origin`]: crate::sim::mem::MemoryImage::origin

mod lex;

use std::collections::BTreeMap;

use logos::Logos;

use lex::Token;

/// A named address, produced by label ingestion.
///
/// Entries are kept in file order; nothing forbids duplicate names or
/// duplicate addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEntry {
    /// The label's name.
    pub name: String,
    /// The resolved absolute address (origin + file value).
    pub addr: u16,
}

/// A named memory window to dump verbatim in the state report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectionEntry {
    /// The window's name.
    pub name: String,
    /// The absolute start address of the window.
    pub addr: u16,
    /// The number of bytes to dump.
    pub size: usize,
}

/// One instruction of an ingested assembler listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingLine {
    /// The instruction text, as it appeared after the address field.
    pub text: String,
    /// The source line this instruction was generated from.
    ///
    /// Listings only mark source lines occasionally (`; L<digits>`); lines
    /// without a marker inherit the most recently seen value.
    pub source_line: u32,
}

/// A sparse map from absolute address to listing line.
///
/// Only addresses that begin an instruction in an ingested listing are
/// populated. Iteration is in address order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing(BTreeMap<u16, ListingLine>);

impl Listing {
    /// Creates an empty listing table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a line at the given absolute address, replacing any previous one.
    pub fn insert(&mut self, addr: u16, line: ListingLine) {
        self.0.insert(addr, line);
    }

    /// Gets the listing line at the given absolute address, if populated.
    pub fn get(&self, addr: u16) -> Option<&ListingLine> {
        self.0.get(&addr)
    }

    /// Iterates over populated addresses in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &ListingLine)> {
        self.0.iter().map(|(&addr, line)| (addr, line))
    }

    /// The number of populated addresses.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no addresses are populated.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Folds another listing table into this one.
    ///
    /// On address collision the other table's line wins, matching the
    /// behavior of ingesting the files one after another.
    pub fn merge(&mut self, other: Listing) {
        self.0.extend(other.0);
    }
}

/// A recoverable problem found while ingesting a symbol file.
///
/// Warnings never abort ingestion: a bad hexadecimal field is substituted
/// with zero and a malformed record is skipped, but parsing continues either
/// way. Callers decide where the diagnostics go (the CLI prints them to
/// stderr).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseWarning {
    /// A field that should have been hexadecimal did not parse; zero was
    /// substituted and the record was kept.
    BadHex {
        /// 1-based line number of the record.
        line: usize,
        /// The offending field text.
        token: String,
    },
    /// A line did not have the expected record shape and was skipped.
    BadRecord {
        /// 1-based line number of the record.
        line: usize,
    },
}

impl std::fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseWarning::BadHex { line, token } => write!(f, "bad hex number: {token} on line {line}"),
            ParseWarning::BadRecord { line }     => write!(f, "malformed record on line {line}"),
        }
    }
}
impl std::error::Error for ParseWarning {}

/// Lexes one record line, or `None` if it contains untokenizable input.
fn lex_line(line: &str) -> Option<Vec<Token>> {
    Token::lexer(line).collect::<Result<_, _>>().ok()
}

/// Parses a hexadecimal field, recovering with a warning and zero on failure.
///
/// Values wider than 16 bits wrap modulo 65536, like every other address
/// computation in the harness.
fn parse_hex(token: &str, line: usize, warnings: &mut Vec<ParseWarning>) -> u16 {
    match u32::from_str_radix(token, 16) {
        Ok(value) => value as u16,
        Err(_) => {
            warnings.push(ParseWarning::BadHex { line, token: token.to_string() });
            0
        }
    }
}

/// Parses `NAME = $ADDR` label records (form A).
///
/// One record per line; anything after the address field is ignored, so the
/// remainder of the line may carry arbitrary commentary. Blank lines are
/// skipped. Every well-formed record appends one [`LabelEntry`] whose address
/// is `origin + value`, wrapping modulo 65536.
///
/// # Example
/// ```
/// use z80_harness::sym::parse_labels;
///
/// let src = "WORKING = $C000\nTEMPORARY = $C400 scratch area\n";
/// let (labels, warnings) = parse_labels(src, 0x0100);
/// assert!(warnings.is_empty());
/// assert_eq!(labels.len(), 2);
/// assert_eq!(labels[0].name, "WORKING");
/// assert_eq!(labels[0].addr, 0xC100);
/// ```
pub fn parse_labels(src: &str, origin: u16) -> (Vec<LabelEntry>, Vec<ParseWarning>) {
    let mut entries = Vec::new();
    let mut warnings = Vec::new();

    for (n, line) in src.lines().enumerate() {
        let line_no = n + 1;
        let Some(tokens) = lex_line(line) else {
            warnings.push(ParseWarning::BadRecord { line: line_no });
            continue;
        };
        if tokens.is_empty() { continue };

        match &tokens[..] {
            [Token::Word(name), Token::Equals, Token::Addr(hex), ..] => {
                let value = parse_hex(hex, line_no, &mut warnings);
                entries.push(LabelEntry {
                    name: name.clone(),
                    addr: origin.wrapping_add(value),
                });
            }
            _ => warnings.push(ParseWarning::BadRecord { line: line_no }),
        }
    }

    (entries, warnings)
}

/// Parses `ADDR NAME` label records (form B).
///
/// Semantics otherwise match [`parse_labels`]: file order is preserved,
/// addresses resolve against `origin`, and bad hex recovers to zero with a
/// warning.
pub fn parse_labels_flat(src: &str, origin: u16) -> (Vec<LabelEntry>, Vec<ParseWarning>) {
    let mut entries = Vec::new();
    let mut warnings = Vec::new();

    for (n, line) in src.lines().enumerate() {
        let line_no = n + 1;
        let Some(tokens) = lex_line(line) else {
            warnings.push(ParseWarning::BadRecord { line: line_no });
            continue;
        };
        if tokens.is_empty() { continue };

        match &tokens[..] {
            [first, Token::Word(name), ..] => match first.hex_text() {
                Some(hex) => {
                    let value = parse_hex(hex, line_no, &mut warnings);
                    entries.push(LabelEntry {
                        name: name.clone(),
                        addr: origin.wrapping_add(value),
                    });
                }
                None => warnings.push(ParseWarning::BadRecord { line: line_no }),
            },
            _ => warnings.push(ParseWarning::BadRecord { line: line_no }),
        }
    }

    (entries, warnings)
}

/// Parses `ADDR SIZE LABEL` inspection records.
///
/// A record without a label field is dropped silently; address and size are
/// hexadecimal with the usual zero-substitution recovery. Inspection
/// addresses are absolute: no origin is applied.
pub fn parse_inspections(src: &str) -> (Vec<InspectionEntry>, Vec<ParseWarning>) {
    let mut entries = Vec::new();
    let mut warnings = Vec::new();

    for (n, line) in src.lines().enumerate() {
        let line_no = n + 1;
        let Some(tokens) = lex_line(line) else {
            warnings.push(ParseWarning::BadRecord { line: line_no });
            continue;
        };

        match &tokens[..] {
            [addr_tok, size_tok, Token::Word(name), ..] => {
                match (addr_tok.hex_text(), size_tok.hex_text()) {
                    (Some(ah), Some(sh)) => {
                        let addr = parse_hex(ah, line_no, &mut warnings);
                        let size = usize::from(parse_hex(sh, line_no, &mut warnings));
                        entries.push(InspectionEntry { name: name.clone(), addr, size });
                    }
                    _ => warnings.push(ParseWarning::BadRecord { line: line_no }),
                }
            }
            // Fewer than three fields means the label is empty; such records
            // are dropped without a diagnostic.
            _ => {}
        }
    }

    (entries, warnings)
}

/// Parses a fixed-column assembler listing into a [`Listing`] table.
///
/// Per line:
/// 1. the address token occupies columns 7 through the next space and must be
///    at most 5 characters;
/// 2. the instruction text follows the first tab after that and extends to
///    the end of the line;
/// 3. lines with no address token, no tab, or empty instruction text are
///    skipped without a diagnostic;
/// 4. a `; L<digits>` marker inside the text sets the source line number,
///    which carries forward to subsequent lines lacking a marker.
///
/// Entries are stored at `origin + address`, wrapping modulo 65536.
pub fn parse_listing(src: &str, origin: u16) -> (Listing, Vec<ParseWarning>) {
    let mut listing = Listing::new();
    let mut warnings = Vec::new();
    let mut last_line = 0u32;

    for (n, raw) in src.lines().enumerate() {
        let line_no = n + 1;

        let Some(rest) = raw.get(6..) else { continue };
        let Some(sp) = rest.find(' ') else { continue };
        if sp > 5 { continue };

        let addr_tok = &rest[..sp];
        let after = &rest[sp + 1..];
        let Some(tab) = after.find('\t') else { continue };
        let text = &after[tab + 1..];
        if text.is_empty() { continue };

        // Only lines with the full listing shape get a hex diagnostic.
        let value = match addr_tok.is_empty() {
            true  => 0,
            false => parse_hex(addr_tok, line_no, &mut warnings),
        };

        if let Some(mark) = text.find("; L") {
            let digits: String = text[mark + 3..].chars().take_while(char::is_ascii_digit).collect();
            if let Ok(v) = digits.parse() {
                last_line = v;
            }
        }

        listing.insert(
            origin.wrapping_add(value),
            ListingLine { text: text.to_string(), source_line: last_line },
        );
    }

    (listing, warnings)
}
