//! Application state for the conversion server

use std::sync::Arc;

use crate::config::StudygenConfig;
use crate::error::Result;
use crate::ingestion::UnstructuredClient;
use crate::processing::{PipelineDriver, TaskRegistry};
use crate::providers::{GenerationProvider, OllamaGenerator};
use crate::storage::ResultsDb;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: StudygenConfig,
    /// Runs conversions; owns the task registry and results store handles
    driver: PipelineDriver,
    /// Generation backend, reported by `/api/info`
    generator: Arc<dyn GenerationProvider>,
}

impl AppState {
    /// Create new application state
    pub async fn new(config: StudygenConfig) -> Result<Self> {
        tracing::info!("Initializing conversion service state...");

        let db = ResultsDb::new(&config.storage.database_path)?;
        tracing::info!("Results database opened at {}", config.storage.database_path.display());

        tokio::fs::create_dir_all(&config.storage.upload_folder).await?;

        let registry = TaskRegistry::new(config.tasks.clone());
        let generator: Arc<dyn GenerationProvider> = Arc::new(OllamaGenerator::new(&config.llm)?);
        let extractor = Arc::new(UnstructuredClient::new(config.extraction.clone())?);
        tracing::info!(
            "Generation via {} ({}), extraction via {}",
            generator.name(),
            generator.model(),
            config.extraction.url
        );

        let driver = PipelineDriver::new(&config, registry, Arc::clone(&generator), extractor, db);
        Ok(Self::from_parts(config, driver, generator))
    }

    /// Assemble state from already-built parts
    pub fn from_parts(
        config: StudygenConfig,
        driver: PipelineDriver,
        generator: Arc<dyn GenerationProvider>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                driver,
                generator,
            }),
        }
    }

    pub fn config(&self) -> &StudygenConfig {
        &self.inner.config
    }

    pub fn driver(&self) -> &PipelineDriver {
        &self.inner.driver
    }

    pub fn registry(&self) -> &TaskRegistry {
        self.inner.driver.registry()
    }

    pub fn db(&self) -> &ResultsDb {
        self.inner.driver.db()
    }

    pub fn generator(&self) -> &Arc<dyn GenerationProvider> {
        &self.inner.generator
    }
}
