//! Test question parsing
//!
//! Expected line shape: `** <type> -- Question: <q> -- Answer: <a>`

use std::collections::HashSet;

use crate::types::{StudyRecord, TestQuestion};

use super::filters::{
    echoes_prompt_example, has_multiple_choice_markup, has_table_reference,
    split_lettered_options,
};
use super::{content_lines, ParseOutcome};

const MULTIPLE_CHOICE: &str = "Multiple Choice";
const TRUE_FALSE: &str = "True/False";

/// Drop a trailing `**` (and any further stars) left by the generator
fn strip_trailing_stars(text: &str) -> &str {
    if text.ends_with("**") {
        text.trim_end_matches('*')
    } else {
        text
    }
}

/// Split one line into `(type, question, answer)`, labels still attached
fn split_line(line: &str) -> Option<(&str, &str, &str)> {
    let parts: Vec<&str> = line.split("--").collect();
    let [head, question, answer] = parts.as_slice() else {
        return None;
    };
    let (_, question_type) = head.split_once("**")?;

    Some((
        strip_trailing_stars(question_type.trim()).trim_end(),
        question.trim(),
        strip_trailing_stars(answer.trim()).trim_end(),
    ))
}

/// Apply the formatting fixes to one parsed line
fn normalize(question_type: &str, question: &str, answer: &str) -> TestQuestion {
    let mut question_type = question_type.to_string();
    let mut question = question.to_string();
    let mut answer = answer.to_string();

    // A bare True/False answer on a "multiple choice" question with no
    // lettered options is really a true/false question
    let bare_boolean = answer == "Answer: True" || answer == "Answer: False";
    if bare_boolean
        && question_type.contains(MULTIPLE_CHOICE)
        && !has_multiple_choice_markup(&question)
    {
        question_type = TRUE_FALSE.to_string();
    }

    if question_type.contains(TRUE_FALSE) && !question.contains("A) True") {
        question.push_str("\nA) True\nB) False");
        if answer.contains("True") {
            answer = "Answer: A) True".to_string();
        } else if answer.contains("False") {
            answer = "Answer: B) False".to_string();
        }
    }

    if question_type.contains(MULTIPLE_CHOICE) {
        question = split_lettered_options(&question);
    }

    TestQuestion {
        question_type,
        question: question.replacen("Question: ", "", 1),
        answer: answer.replacen("Answer: ", "", 1),
    }
}

/// Parse test question lines.
///
/// A repeated question or a repeated answer (as the generator wrote them,
/// before any reformatting) is enough to drop a line, as are
/// echoes of the prompt's example and references to numbered tables.
/// Lines that do not split into three parts are skipped with a warning.
pub fn parse_test_questions(raw: &str) -> ParseOutcome {
    let mut seen_questions: HashSet<String> = HashSet::new();
    let mut seen_answers: HashSet<String> = HashSet::new();
    let mut records = Vec::new();
    let mut lines = 0usize;
    let mut structured = 0usize;

    for line in content_lines(raw) {
        lines += 1;

        let Some((question_type, question, answer)) = split_line(line) else {
            tracing::warn!("Skipping malformed test question line: {}", line);
            continue;
        };
        structured += 1;

        // Keyed on the generator's own text, before the option rewrite
        // collapses every true/false answer to the same two strings
        let question_key = question.replacen("Question: ", "", 1);
        let answer_key = answer.replacen("Answer: ", "", 1);
        if seen_questions.contains(&question_key) || seen_answers.contains(&answer_key) {
            continue;
        }

        let parsed = normalize(question_type, question, answer);
        if echoes_prompt_example(&parsed.question) || has_table_reference(&parsed.question) {
            continue;
        }

        seen_questions.insert(question_key);
        seen_answers.insert(answer_key);
        records.push(StudyRecord::from(parsed));
    }

    if lines > 0 && structured == 0 {
        return ParseOutcome::Malformed("no '** type -- Question -- Answer' lines".to_string());
    }

    ParseOutcome::Records(records)
}
