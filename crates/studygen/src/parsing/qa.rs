//! Q&A flashcard parsing

use std::collections::HashSet;

use crate::types::{QaPair, StudyRecord};

use super::filters::has_table_reference;
use super::{content_lines, ParseOutcome};

/// Marker the generator emits when a chunk has nothing worth a flashcard
const NO_DATA_MARKER: &str = "Q2A: None";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Question,
    Answer,
}

#[derive(Debug, Clone, PartialEq)]
struct QaLine {
    side: Side,
    text: String,
}

/// Fold unmarked lines into the question or answer currently open.
///
/// Lines appearing before the first `Q:`/`A:` marker have nothing to attach
/// to and are dropped.
fn merge_qa_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Vec<QaLine> {
    let mut merged: Vec<QaLine> = Vec::new();

    for line in lines {
        let side = if line.starts_with("Q:") {
            Some(Side::Question)
        } else if line.starts_with("A:") {
            Some(Side::Answer)
        } else {
            None
        };

        match (side, merged.last_mut()) {
            (Some(side), _) => merged.push(QaLine {
                side,
                text: line.to_string(),
            }),
            (None, Some(open)) => {
                open.text.push(' ');
                open.text.push_str(line);
            }
            (None, None) => tracing::debug!("Dropping Q&A line before first marker: {}", line),
        }
    }

    merged
}

fn strip_marker<'a>(text: &'a str, marker: &str) -> &'a str {
    text.strip_prefix(marker).unwrap_or(text).trim()
}

/// Parse `Q: ... A: ...` output into flashcards.
///
/// A pair is a duplicate only when both its question and its answer were
/// already seen in this response. Questions citing a numbered table are
/// dropped.
pub fn parse_qa(raw: &str) -> ParseOutcome {
    let text = raw.replace("[NEWLINE]", "\n");

    if text.contains(NO_DATA_MARKER) {
        tracing::debug!("Generator reported no Q&A data for chunk");
        return ParseOutcome::Skip;
    }

    let mut lines = content_lines(&text).peekable();
    if lines.peek().is_none() {
        return ParseOutcome::Records(Vec::new());
    }

    let merged = merge_qa_lines(lines);
    if merged.is_empty() {
        return ParseOutcome::Malformed("no Q:/A: markers in response".to_string());
    }

    if merged.len() % 2 != 0 {
        tracing::warn!(
            "Uneven Q&A response ({} lines): missing question or answer, or extra output",
            merged.len()
        );
    }

    let mut pairs: Vec<(String, String)> = Vec::with_capacity(merged.len() / 2);
    let mut open_question: Option<String> = None;
    for line in merged {
        match line.side {
            Side::Question => {
                if let Some(unanswered) = open_question.replace(line.text) {
                    tracing::warn!("Question without answer dropped: {}", unanswered);
                }
            }
            Side::Answer => match open_question.take() {
                Some(question) => pairs.push((question, line.text)),
                None => tracing::warn!("Answer without question dropped: {}", line.text),
            },
        }
    }
    if let Some(unanswered) = open_question {
        tracing::warn!("Question without answer dropped: {}", unanswered);
    }

    let mut seen_questions: HashSet<String> = HashSet::new();
    let mut seen_answers: HashSet<String> = HashSet::new();
    let mut records = Vec::with_capacity(pairs.len());

    for (question, answer) in pairs {
        let question = strip_marker(&question, "Q:");
        let answer = strip_marker(&answer, "A:");

        if seen_questions.contains(question) && seen_answers.contains(answer) {
            continue;
        }

        if has_table_reference(question) {
            continue;
        }

        seen_questions.insert(question.to_string());
        seen_answers.insert(answer.to_string());
        records.push(StudyRecord::from(QaPair::new(question, answer)));
    }

    ParseOutcome::Records(records)
}
