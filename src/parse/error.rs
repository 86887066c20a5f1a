use crate::prelude::*;

use super::line_summary::LineSummary;

/// everything that can go wrong while walking the bytes of a snapshot file
#[derive(Debug, thiserror::Error, From)]
pub enum ParseError {
    #[error("{0}")]
    Truncated(Truncated),
    #[error("{0}")]
    UnsupportedRank(UnsupportedRank),
    #[error("{0}")]
    NegativeExtent(NegativeExtent),
    #[error("{0}")]
    SerialRank(SerialRank),
    #[error("{0}")]
    UnknownElementKind(UnknownElementKind),
    #[error("{0}")]
    UnrecognizedHeader(UnrecognizedHeader),
    #[error("{0}")]
    UnknownDatatype(UnknownDatatype),
    #[error("{0}")]
    LineTooLong(LineTooLong),
    #[error("{0}")]
    MalformedLine(MalformedLine),
    #[error("{0}")]
    GridDescription(GridDescription),
    #[error("{0}")]
    MalformedXml(MalformedXml),
    #[error("{0}")]
    MalformedAttribute(MalformedAttribute),
}

#[derive(From, Display, Debug, Constructor)]
#[display(
    fmt = "unexpected end of input while reading {context}: expected {expected} bytes, found {found}"
)]
pub struct Truncated {
    context: &'static str,
    expected: u64,
    found: u64,
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "field `{name}` declares rank {rank}, at most 3 axes are supported")]
pub struct UnsupportedRank {
    name: String,
    rank: i32,
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "field `{name}` declares a negative extent {extent}")]
pub struct NegativeExtent {
    name: String,
    extent: i32,
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "serial field `{name}` must have rank 1, got rank {rank}")]
pub struct SerialRank {
    name: String,
    rank: usize,
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "field `{name}` declares an unknown element type code {code}")]
pub struct UnknownElementKind {
    name: String,
    code: i32,
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "expected `DIMENSIONS` or `FIELD` after the file preamble, got {line}")]
pub struct UnrecognizedHeader {
    line: LineSummary,
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "unknown data block declaration {line}, expected `SCALARS` or `VECTORS`")]
pub struct UnknownDatatype {
    line: LineSummary,
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "{line} runs past {limit} bytes without a line break")]
pub struct LineTooLong {
    line: LineSummary,
    limit: usize,
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "could not parse {context} from {line}")]
pub struct MalformedLine {
    context: &'static str,
    line: LineSummary,
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "invalid grid description at line {line_number}: {reason}")]
pub struct GridDescription {
    line_number: usize,
    reason: String,
}

#[derive(From, Display, Debug)]
#[display(fmt = "failed to parse an xml element: {xml_err}")]
pub struct MalformedXml {
    xml_err: quick_xml::Error,
}

#[derive(From, Display, Debug)]
#[display(fmt = "failed to parse an xml attribute: {att_err}")]
pub struct MalformedAttribute {
    att_err: quick_xml::events::attributes::AttrError,
}
