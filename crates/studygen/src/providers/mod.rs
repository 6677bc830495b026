//! Provider abstractions for the generation backend
//!
//! Trait:
//! - `GenerationProvider`: turns a chunk of document text into raw study
//!   material text for one flavor
//!
//! Implementation:
//! - `ollama`: local Ollama server

pub mod llm;
pub mod ollama;

pub use llm::{GenerationProvider, GenerationRequest};
pub use ollama::OllamaGenerator;
