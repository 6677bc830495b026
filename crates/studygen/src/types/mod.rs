//! Core types for conversions and their results

pub mod conversion;
pub mod record;

pub use conversion::{ConversionOptions, ConversionType, Flavor, TestQuestionKind};
pub use record::{KeywordPair, QaPair, StudyRecord, TestQuestion};
