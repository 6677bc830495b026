//! Prompt construction for study material generation

pub mod prompt;

pub use prompt::PromptBuilder;
