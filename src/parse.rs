//! errors and shared helpers for the text portions of snapshot files
//!
//! All of the supported formats mix binary payloads with short ASCII declarations
//! (`DIMENSIONS 65 65 1`, `SCALARS RHO float`, `64` row counts in `grid.out`, ...).
//! The helpers here split those declarations into tokens and turn parse failures
//! into a [`ParseError`] that carries the offending line.

mod error;
mod line_summary;

pub use error::*;
pub use line_summary::LineSummary;

use std::str::FromStr;

/// a single ASCII declaration line split on whitespace
#[derive(Debug, Clone)]
pub(crate) struct Tokens<'a> {
    raw: &'a [u8],
    tokens: Vec<&'a str>,
}

impl<'a> Tokens<'a> {
    /// split a raw line. Bytes that are not valid UTF-8 end the token list, since a
    /// declaration line is followed directly by binary data in most formats.
    pub(crate) fn new(raw: &'a [u8]) -> Self {
        let text = match std::str::from_utf8(raw) {
            Ok(text) => text,
            Err(e) => {
                let valid = e.valid_up_to();
                // valid_up_to guarantees this prefix is valid utf8
                std::str::from_utf8(&raw[..valid]).unwrap_or_default()
            }
        };

        Self {
            raw,
            tokens: text.split_ascii_whitespace().collect(),
        }
    }

    pub(crate) fn first(&self) -> Option<&'a str> {
        self.tokens.first().copied()
    }

    pub(crate) fn get(&self, idx: usize) -> Option<&'a str> {
        self.tokens.get(idx).copied()
    }

    pub(crate) fn summary(&self) -> LineSummary {
        LineSummary::new(self.raw)
    }

    /// parse the token at `idx`, reporting the whole line on failure
    pub(crate) fn parse<T: FromStr>(&self, idx: usize, context: &'static str) -> Result<T, ParseError> {
        self.get(idx)
            .and_then(|token| token.parse().ok())
            .ok_or_else(|| MalformedLine::new(context, self.summary()).into())
    }
}
