//! Structured study records parsed from generated text
//!
//! Records serialize as JSON arrays (`[question, answer]`,
//! `[keyword, definition]`, `[question_type, question, answer]`), the format
//! the results viewer and exporters read.

use serde::{Deserialize, Serialize};

/// Flashcard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

impl QaPair {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

impl From<(String, String)> for QaPair {
    fn from((question, answer): (String, String)) -> Self {
        Self { question, answer }
    }
}

impl From<QaPair> for (String, String) {
    fn from(pair: QaPair) -> Self {
        (pair.question, pair.answer)
    }
}

/// Keyword with its definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct KeywordPair {
    pub keyword: String,
    pub definition: String,
}

impl KeywordPair {
    pub fn new(keyword: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            definition: definition.into(),
        }
    }
}

impl From<(String, String)> for KeywordPair {
    fn from((keyword, definition): (String, String)) -> Self {
        Self { keyword, definition }
    }
}

impl From<KeywordPair> for (String, String) {
    fn from(pair: KeywordPair) -> Self {
        (pair.keyword, pair.definition)
    }
}

/// Test question; `question` may carry one answer option per line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "(String, String, String)",
    into = "(String, String, String)"
)]
pub struct TestQuestion {
    pub question_type: String,
    pub question: String,
    pub answer: String,
}

impl TestQuestion {
    pub fn new(
        question_type: impl Into<String>,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            question_type: question_type.into(),
            question: question.into(),
            answer: answer.into(),
        }
    }
}

impl From<(String, String, String)> for TestQuestion {
    fn from((question_type, question, answer): (String, String, String)) -> Self {
        Self {
            question_type,
            question,
            answer,
        }
    }
}

impl From<TestQuestion> for (String, String, String) {
    fn from(q: TestQuestion) -> Self {
        (q.question_type, q.question, q.answer)
    }
}

/// A record of any flavor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StudyRecord {
    Qa(QaPair),
    Keyword(KeywordPair),
    Test(TestQuestion),
}

impl From<QaPair> for StudyRecord {
    fn from(pair: QaPair) -> Self {
        Self::Qa(pair)
    }
}

impl From<KeywordPair> for StudyRecord {
    fn from(pair: KeywordPair) -> Self {
        Self::Keyword(pair)
    }
}

impl From<TestQuestion> for StudyRecord {
    fn from(question: TestQuestion) -> Self {
        Self::Test(question)
    }
}
