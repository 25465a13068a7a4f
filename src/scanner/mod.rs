//! XML Tag Scanner
//!
//! Fast lexical pass over raw XML text. No tree is built here; the
//! output is a flat segment stream with line numbers that the
//! validation passes consume.

pub mod attributes;
pub mod lexer;
pub mod lines;

pub use attributes::{find_attribute, parse_attributes, Attribute, AttributeValue};
pub use lexer::{
    scan, Region, RegionKind, Scan, ScanError, Segment, TagKind, TagToken, TextRun, Unterminated,
};
pub use lines::LineIndex;
