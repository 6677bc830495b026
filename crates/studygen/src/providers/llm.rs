//! Generation provider trait: one chunk of text in, free-form text out

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ConversionOptions, Flavor};

/// What to generate from a chunk
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub flavor: Flavor,
    pub options: ConversionOptions,
}

impl GenerationRequest {
    pub fn new(flavor: Flavor, options: ConversionOptions) -> Self {
        Self { flavor, options }
    }
}

/// Trait for LLM-based study material generation
///
/// Implementations:
/// - `OllamaGenerator`: Local Ollama server
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Generate raw text for one chunk; parsing is the caller's job
    async fn generate(&self, chunk: &str, request: &GenerationRequest) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
