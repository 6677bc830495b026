//! Keyword/definition parsing

use std::collections::HashSet;

use crate::types::{KeywordPair, StudyRecord};

use super::filters::has_table_reference;
use super::{content_lines, ParseOutcome};

/// Parse `Keyword: Definition` lines.
///
/// Lines without a colon are ignored. A repeated keyword or a repeated
/// definition is enough to drop a line.
pub fn parse_keywords(raw: &str) -> ParseOutcome {
    let mut seen_keywords: HashSet<String> = HashSet::new();
    let mut seen_definitions: HashSet<String> = HashSet::new();
    let mut records = Vec::new();
    let mut lines = 0usize;
    let mut structured = 0usize;

    for line in content_lines(raw) {
        lines += 1;

        let Some((keyword, definition)) = line.split_once(':') else {
            continue;
        };
        structured += 1;

        let keyword = keyword.trim();
        let definition = definition.trim();
        if keyword.is_empty() || definition.is_empty() {
            continue;
        }

        if seen_keywords.contains(keyword) || seen_definitions.contains(definition) {
            continue;
        }

        if has_table_reference(definition) {
            continue;
        }

        seen_keywords.insert(keyword.to_string());
        seen_definitions.insert(definition.to_string());
        records.push(StudyRecord::from(KeywordPair::new(keyword, definition)));
    }

    if lines > 0 && structured == 0 {
        return ParseOutcome::Malformed("no 'keyword: definition' lines in response".to_string());
    }

    ParseOutcome::Records(records)
}
