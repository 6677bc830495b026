//! Conversion requests: what to produce from an uploaded document

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Structured output kinds produced by the generation pipeline
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    /// Q&A flashcards
    Flashcards,
    /// Keyword/definition pairs
    Keywords,
    /// Test questions
    Test,
}

impl Flavor {
    pub const ALL: [Flavor; 3] = [Flavor::Flashcards, Flavor::Keywords, Flavor::Test];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flashcards => "flashcards",
            Self::Keywords => "keywords",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Flavor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "flashcards" => Ok(Self::Flashcards),
            "keywords" => Ok(Self::Keywords),
            "test" => Ok(Self::Test),
            other => Err(Error::validation(format!("Unknown output flavor: {}", other))),
        }
    }
}

/// Work requested by a conversion call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionType {
    /// Run the document through the extraction service
    Text,
    /// Generate structured records from extracted text
    Generate(Flavor),
}

impl ConversionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Generate(flavor) => flavor.as_str(),
        }
    }
}

impl FromStr for ConversionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("text") {
            return Ok(Self::Text);
        }
        s.parse::<Flavor>()
            .map(Self::Generate)
            .map_err(|_| Error::validation(format!("Unknown conversion type: {}", s)))
    }
}

/// Question kinds selectable for the `test` flavor
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TestQuestionKind {
    #[serde(rename = "test_multiple_choice")]
    MultipleChoice,
    #[serde(rename = "test_true_false")]
    TrueFalse,
    #[serde(rename = "test_free_response")]
    FreeResponse,
}

/// Per-request generation options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionOptions {
    /// Question kinds to ask for; only read by the `test` flavor
    pub test: Vec<TestQuestionKind>,
}

impl ConversionOptions {
    /// Options for the `test` flavor; an empty selection means every kind
    pub fn test_kinds(&self) -> Vec<TestQuestionKind> {
        if self.test.is_empty() {
            vec![
                TestQuestionKind::MultipleChoice,
                TestQuestionKind::TrueFalse,
                TestQuestionKind::FreeResponse,
            ]
        } else {
            self.test.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_type_parsing() {
        assert_eq!("text".parse::<ConversionType>().unwrap(), ConversionType::Text);
        assert_eq!(
            "Flashcards".parse::<ConversionType>().unwrap(),
            ConversionType::Generate(Flavor::Flashcards)
        );
        assert_eq!(
            "test".parse::<ConversionType>().unwrap().as_str(),
            "test"
        );
        assert!("essay".parse::<ConversionType>().is_err());
    }

    #[test]
    fn test_options_from_request_json() {
        let options: ConversionOptions =
            serde_json::from_str(r#"{"test": ["test_true_false", "test_free_response"]}"#).unwrap();
        assert_eq!(
            options.test,
            vec![TestQuestionKind::TrueFalse, TestQuestionKind::FreeResponse]
        );

        let empty: ConversionOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.test_kinds().len(), 3);
    }
}
