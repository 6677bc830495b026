//! Document → text element extraction via the Unstructured API

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ExtractionConfig;
use crate::error::{Error, Result};

/// One element returned by the extraction service.
///
/// Only the fields the chunker needs are kept; anything else in the service
/// response (coordinates, metadata, ids) is ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextElement {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl TextElement {
    /// Untyped element holding `text`
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            element_type: None,
            text: Some(text.into()),
        }
    }
}

/// Turns an uploaded document into ordered text elements
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    async fn extract(&self, filename: &str, data: Vec<u8>) -> Result<Vec<TextElement>>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Client for an Unstructured (`/general/v0/general`) endpoint
pub struct UnstructuredClient {
    client: Client,
    config: ExtractionConfig,
}

impl UnstructuredClient {
    pub fn new(config: ExtractionConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl DocumentExtractor for UnstructuredClient {
    async fn extract(&self, filename: &str, data: Vec<u8>) -> Result<Vec<TextElement>> {
        let size = data.len();
        let form = reqwest::multipart::Form::new()
            .part(
                "files",
                reqwest::multipart::Part::bytes(data).file_name(filename.to_string()),
            )
            .text("encoding", "utf_8")
            .text("include_page_breaks", "true")
            .text("coordinates", "false")
            .text("strategy", self.config.strategy.clone());

        let mut request = self
            .client
            .post(&self.config.url)
            .header("accept", "application/json")
            .multipart(form);

        if let Some(ref api_key) = self.config.api_key {
            request = request.header("unstructured-api-key", api_key);
        }

        tracing::debug!("Sending {} ({} bytes) to extraction service", filename, size);

        let response = request
            .send()
            .await
            .map_err(|e| Error::extraction(format!("Unstructured API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::extraction(format!(
                "Unstructured API error: {} - {}",
                status, body
            )));
        }

        let elements: Vec<TextElement> = response.json().await.map_err(|e| {
            Error::extraction(format!("Failed to parse Unstructured response: {}", e))
        })?;

        tracing::info!("Extracted {} elements from {}", elements.len(), filename);
        Ok(elements)
    }

    fn name(&self) -> &str {
        "unstructured"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_ignores_extra_fields() {
        let raw = r#"[
            {"type": "Title", "element_id": "a1", "text": "Cell Biology", "metadata": {"page_number": 1}},
            {"type": "PageBreak", "element_id": "a2", "text": "", "metadata": {}},
            {"type": "Image", "element_id": "a3", "metadata": {}}
        ]"#;

        let elements: Vec<TextElement> = serde_json::from_str(raw).unwrap();
        assert_eq!(elements.len(), 3);
        assert_eq!(elements[0].element_type.as_deref(), Some("Title"));
        assert_eq!(elements[0].text.as_deref(), Some("Cell Biology"));
        assert_eq!(elements[1].text.as_deref(), Some(""));
        assert!(elements[2].text.is_none());
    }
}
