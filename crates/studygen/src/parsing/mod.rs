//! Parsing of free-form generated text into deduplicated study records
//!
//! Each flavor has its own tolerant parser. Parsers never fail: a response
//! they cannot use is reported as [`ParseOutcome::Skip`] (the generator said
//! there is nothing to extract) or [`ParseOutcome::Malformed`] (no line had
//! the expected structure). Either way the chunk contributes no records.

pub mod filters;
pub mod keywords;
pub mod qa;
pub mod test_questions;

use crate::types::{Flavor, StudyRecord};

pub use keywords::parse_keywords;
pub use qa::parse_qa;
pub use test_questions::parse_test_questions;

/// Result of parsing one generated response
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// Parsed; may be empty when every line was filtered out
    Records(Vec<StudyRecord>),
    /// Generator signalled there was nothing to produce for this chunk
    Skip,
    /// Nothing in the response had the expected shape
    Malformed(String),
}

impl ParseOutcome {
    /// Records to keep from this chunk
    pub fn into_records(self) -> Vec<StudyRecord> {
        match self {
            Self::Records(records) => records,
            Self::Skip | Self::Malformed(_) => Vec::new(),
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip)
    }
}

/// Parse a response with the parser for `flavor`
pub fn parse_response(flavor: Flavor, raw: &str) -> ParseOutcome {
    match flavor {
        Flavor::Flashcards => parse_qa(raw),
        Flavor::Keywords => parse_keywords(raw),
        Flavor::Test => parse_test_questions(raw),
    }
}

/// Non-blank lines with surrounding whitespace removed
pub(crate) fn content_lines(raw: &str) -> impl Iterator<Item = &str> {
    raw.lines().map(str::trim).filter(|line| !line.is_empty())
}
