//! Configuration for the conversion service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Environment variable naming a TOML config file
pub const CONFIG_ENV_VAR: &str = "STUDYGEN_CONFIG";

/// Main service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StudygenConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Task registry configuration
    pub tasks: TaskConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Ollama/LLM configuration
    pub llm: LlmConfig,
    /// Document extraction service configuration
    pub extraction: ExtractionConfig,
    /// Processing configuration
    pub processing: ProcessingConfig,
    /// Storage configuration
    pub storage: StorageConfig,
}

impl StudygenConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&raw)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)
            .map_err(|e| Error::Config(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the file named by `STUDYGEN_CONFIG`, or defaults when unset
    pub fn load() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => Self::from_file(PathBuf::from(path)),
            None => Ok(Self::default()),
        }
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.chunking.max_input_length == 0 {
            return Err(Error::Config("chunking.max_input_length must be > 0".to_string()));
        }
        if self.chunking.min_input_length > self.chunking.max_input_length {
            return Err(Error::Config(format!(
                "chunking.min_input_length ({}) exceeds max_input_length ({})",
                self.chunking.min_input_length, self.chunking.max_input_length
            )));
        }
        if self.processing.concurrent_generation_limit == 0 {
            return Err(Error::Config(
                "processing.concurrent_generation_limit must be >= 1".to_string(),
            ));
        }
        if self.extraction.concurrent_limit == 0 {
            return Err(Error::Config("extraction.concurrent_limit must be >= 1".to_string()));
        }
        if self.tasks.reap_interval_secs == 0 {
            return Err(Error::Config("tasks.reap_interval_secs must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum request body size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            max_body_size: 1024 * 1024,
        }
    }
}

/// Task registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// Idle time after which a task is reaped
    pub stale_timeout_secs: u64,
    /// Pause between reaper scans
    pub reap_interval_secs: u64,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            stale_timeout_secs: 10,
            reap_interval_secs: 10,
        }
    }
}

impl TaskConfig {
    pub fn stale_timeout(&self) -> Duration {
        Duration::from_secs(self.stale_timeout_secs)
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs)
    }
}

/// Text chunking configuration (lengths in characters)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Elements shorter than this are merged into the previous chunk
    pub min_input_length: usize,
    /// Hard upper bound of a chunk
    pub max_input_length: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            min_input_length: 500,
            max_input_length: 1096,
        }
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Generation model name
    pub generate_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            generate_model: "llama3.2:3b".to_string(),
            temperature: 0.0,
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

/// Document extraction (unstructured API) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Unstructured API URL
    pub url: String,
    /// API key (optional for self-hosted deployments)
    pub api_key: Option<String>,
    /// Partitioning strategy sent with each request
    pub strategy: String,
    /// How many documents the extraction service handles at a time
    pub concurrent_limit: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            url: "http://unstructured-api:8000/general/v0/general".to_string(),
            api_key: None,
            strategy: "fast".to_string(),
            concurrent_limit: 2,
            timeout_secs: 300,
        }
    }
}

/// Processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Generation calls allowed in flight across all tasks
    pub concurrent_generation_limit: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            concurrent_generation_limit: 2,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding uploaded documents named `{md5_name}.{extension}`
    pub upload_folder: PathBuf,
    /// SQLite database for extracted elements and generated records
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("studygen");

        Self {
            upload_folder: data_dir.join("file-upload"),
            database_path: data_dir.join("studygen.db"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = StudygenConfig::default();
        assert_eq!(config.tasks.stale_timeout_secs, 10);
        assert_eq!(config.tasks.reap_interval_secs, 10);
        assert_eq!(config.chunking.min_input_length, 500);
        assert_eq!(config.chunking.max_input_length, 1096);
        assert_eq!(config.processing.concurrent_generation_limit, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = StudygenConfig::from_toml(
            r#"
            [tasks]
            stale_timeout_secs = 30

            [llm]
            generate_model = "phi3"
            "#,
        )
        .unwrap();

        assert_eq!(config.tasks.stale_timeout_secs, 30);
        assert_eq!(config.tasks.reap_interval_secs, 10);
        assert_eq!(config.llm.generate_model, "phi3");
        assert_eq!(config.llm.max_retries, 2);
    }

    #[test]
    fn test_invalid_chunking_rejected() {
        let result = StudygenConfig::from_toml(
            r#"
            [chunking]
            min_input_length = 2000
            max_input_length = 1000
            "#,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[processing]\nconcurrent_generation_limit = 4").unwrap();

        let config = StudygenConfig::from_file(file.path()).unwrap();
        assert_eq!(config.processing.concurrent_generation_limit, 4);
    }
}
