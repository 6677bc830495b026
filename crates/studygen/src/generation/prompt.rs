//! Prompt templates for the three output flavors

use crate::types::{ConversionOptions, Flavor, TestQuestionKind};

/// Prompt builder for study material generation
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the prompt for `flavor` over one chunk of document text
    pub fn build(flavor: Flavor, chunk: &str, options: &ConversionOptions) -> String {
        match flavor {
            Flavor::Flashcards => Self::build_qa_prompt(chunk),
            Flavor::Keywords => Self::build_keyword_prompt(chunk),
            Flavor::Test => Self::build_test_prompt(chunk, &options.test_kinds()),
        }
    }

    /// Flashcards, answered as `Q: ... [NEWLINE] A: ...`
    pub fn build_qa_prompt(chunk: &str) -> String {
        format!(
            r#"Generate brief, 'brain-friendly' Q&A flashcards from the provided data.
You are required to respond with: 'Q: ... [NEWLINE] A: ...'
If the data contains nothing worth a flashcard, respond with exactly: Q2A: None
Here is the provided data:
{chunk}"#,
            chunk = chunk
        )
    }

    /// `Keyword: Definition` lines
    pub fn build_keyword_prompt(chunk: &str) -> String {
        format!(
            r#"Please analyze the data and provide 'keyword: definition' pairs relevant for study. Your responses should strictly follow this format without numbering:
Keyword: Definition
Do NOT include the words 'Keyword' or 'Definition' in the output. The provided data is as follows:
{chunk}"#,
            chunk = chunk
        )
    }

    /// Test questions of the selected kinds
    pub fn build_test_prompt(chunk: &str, kinds: &[TestQuestionKind]) -> String {
        let question_types: String = kinds
            .iter()
            .map(|kind| format!("{}\n", Self::describe_kind(*kind)))
            .collect();

        format!(
            r#"Create a very large amount of test/quiz questions from data using the following question type(s):
{question_types}
Your responses should strictly follow this format, one question per line:
** [question_type] -- Question: [question] -- Answer: [answer]
The provided data is as follows:
{chunk}"#,
            question_types = question_types,
            chunk = chunk
        )
    }

    fn describe_kind(kind: TestQuestionKind) -> &'static str {
        match kind {
            TestQuestionKind::MultipleChoice => {
                "Multiple Choice (always include lettered options in the question). Multiple Choice strict format example:\n\
                 Which of the following is not a primary color? A) Red B) Yellow C) Green D) Purple -- Answer: D) Purple"
            }
            TestQuestionKind::TrueFalse => "True/False Questions",
            TestQuestionKind::FreeResponse => "Free Response",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::filters::echoes_prompt_example;

    #[test]
    fn test_qa_prompt_format() {
        let prompt = PromptBuilder::build(Flavor::Flashcards, "Cells divide.", &ConversionOptions::default());
        assert!(prompt.contains("'Q: ... [NEWLINE] A: ...'"));
        assert!(prompt.ends_with("Cells divide."));
    }

    #[test]
    fn test_test_prompt_lists_selected_kinds() {
        let options = ConversionOptions {
            test: vec![TestQuestionKind::TrueFalse],
        };
        let prompt = PromptBuilder::build(Flavor::Test, "Water boils at 100C.", &options);
        assert!(prompt.contains("True/False Questions"));
        assert!(!prompt.contains("Free Response"));
        assert!(prompt.contains("** [question_type] -- Question: [question] -- Answer: [answer]"));
    }

    #[test]
    fn test_multiple_choice_example_is_filtered_when_echoed() {
        let prompt = PromptBuilder::build_test_prompt("x", &[TestQuestionKind::MultipleChoice]);
        let example = prompt
            .lines()
            .find(|line| line.contains("-- Answer: D) Purple"))
            .unwrap();
        assert!(echoes_prompt_example(example));
    }
}
