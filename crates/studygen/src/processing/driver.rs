//! Background conversion driver
//!
//! Runs one task from `processing` to `completed` or `error`:
//! - extraction: uploaded file → text elements (stored per document)
//! - generation: stored elements → chunks → generation call per chunk
//!   (sequential, gated by the shared limiter) → parsed records → storage
//!
//! Failures never escape the driver. They become an `error` status with
//! `error_msg`/`error_type` attributes on the task.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::config::StudygenConfig;
use crate::error::{Error, Result};
use crate::ingestion::{DocumentExtractor, TextChunker};
use crate::parsing::{parse_response, ParseOutcome};
use crate::providers::{GenerationProvider, GenerationRequest};
use crate::storage::ResultsDb;
use crate::types::{ConversionOptions, Flavor};

use super::limiter::ConcurrencyLimiter;
use super::registry::{TaskError, TaskRegistry};
use super::task::TaskStatus;

/// Message shown to users whose upload is gone from disk
pub const MISSING_UPLOAD_MESSAGE: &str =
    "Unable to find uploaded file. Try uploading the file again.";

/// Generate one flavor of records for an extracted document
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub task_id: String,
    pub md5_name: String,
    pub flavor: Flavor,
    pub options: ConversionOptions,
}

/// Run an uploaded document through the extraction service
#[derive(Debug, Clone)]
pub struct ExtractionJob {
    pub task_id: String,
    pub md5_name: String,
    /// Upload file extension, without the dot
    pub extension: String,
}

/// How a task finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Results were already stored; nothing was run
    AlreadyStored,
    /// Work ran and stored this many records or elements
    Stored(usize),
}

/// Drives conversion and extraction tasks, reporting into the task registry
#[derive(Clone)]
pub struct PipelineDriver {
    registry: TaskRegistry,
    generator: Arc<dyn GenerationProvider>,
    extractor: Arc<dyn DocumentExtractor>,
    db: ResultsDb,
    chunker: TextChunker,
    generation_limiter: ConcurrencyLimiter,
    extraction_limiter: ConcurrencyLimiter,
    upload_folder: PathBuf,
}

impl PipelineDriver {
    pub fn new(
        config: &StudygenConfig,
        registry: TaskRegistry,
        generator: Arc<dyn GenerationProvider>,
        extractor: Arc<dyn DocumentExtractor>,
        db: ResultsDb,
    ) -> Self {
        tracing::info!(
            "Pipeline driver configured: {} generation call(s), {} extraction call(s) in flight",
            config.processing.concurrent_generation_limit,
            config.extraction.concurrent_limit
        );

        Self {
            registry,
            generator,
            extractor,
            db,
            chunker: TextChunker::from_config(&config.chunking),
            generation_limiter: ConcurrencyLimiter::new(
                "generation",
                config.processing.concurrent_generation_limit,
            ),
            extraction_limiter: ConcurrencyLimiter::new(
                "extraction",
                config.extraction.concurrent_limit,
            ),
            upload_folder: config.storage.upload_folder.clone(),
        }
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn db(&self) -> &ResultsDb {
        &self.db
    }

    pub fn generation_limiter(&self) -> &ConcurrencyLimiter {
        &self.generation_limiter
    }

    /// Path of the uploaded document for `md5_name`
    pub fn upload_path(&self, md5_name: &str, extension: &str) -> PathBuf {
        self.upload_folder.join(format!("{}.{}", md5_name, extension))
    }

    /// Run a conversion on the current runtime
    pub fn spawn_conversion(&self, job: ConversionJob) -> JoinHandle<()> {
        let driver = self.clone();
        tokio::spawn(async move { driver.run_conversion(job).await })
    }

    /// Run an extraction on the current runtime
    pub fn spawn_extraction(&self, job: ExtractionJob) -> JoinHandle<()> {
        let driver = self.clone();
        tokio::spawn(async move { driver.run_extraction(job).await })
    }

    /// Generate `job.flavor` records and store them
    pub async fn run_conversion(&self, job: ConversionJob) {
        self.registry.set_status(&job.task_id, TaskStatus::Processing);
        tracing::info!(
            "Task {}: generating {} for {}",
            job.task_id,
            job.flavor,
            job.md5_name
        );

        match self.convert(&job).await {
            Ok(outcome) => self.complete(&job.task_id, &outcome),
            Err(e) => self.fail(&job.task_id, &e),
        }
    }

    /// Extract text elements from the uploaded file and store them
    pub async fn run_extraction(&self, job: ExtractionJob) {
        self.registry.set_status(&job.task_id, TaskStatus::Processing);
        tracing::info!("Task {}: extracting text from {}", job.task_id, job.md5_name);

        match self.extract(&job).await {
            Ok(outcome) => self.complete(&job.task_id, &outcome),
            Err(e) => self.fail(&job.task_id, &e),
        }
    }

    async fn convert(&self, job: &ConversionJob) -> Result<JobOutcome> {
        if self.db.has_conversion(&job.md5_name, job.flavor)? {
            tracing::debug!("{} already exists for {}, skipping generation", job.flavor, job.md5_name);
            return Ok(JobOutcome::AlreadyStored);
        }

        let elements = self.db.load_elements(&job.md5_name)?.ok_or_else(|| {
            Error::DocumentNotFound(format!("No extracted text for {}", job.md5_name))
        })?;

        let chunks = self.chunker.chunk_elements(&elements);
        let total = chunks.len();
        tracing::debug!("Task {}: {} chunk(s) to generate", job.task_id, total);

        let request = GenerationRequest::new(job.flavor, job.options.clone());
        let mut records = Vec::new();

        for (index, chunk) in chunks.iter().enumerate() {
            let raw = self
                .generation_limiter
                .run(self.generator.generate(chunk, &request))
                .await??;

            match parse_response(job.flavor, &raw) {
                ParseOutcome::Records(parsed) => {
                    tracing::debug!(
                        "Task {}: chunk {}/{} gave {} record(s)",
                        job.task_id,
                        index + 1,
                        total,
                        parsed.len()
                    );
                    records.extend(parsed);
                }
                ParseOutcome::Skip => {
                    tracing::debug!("Task {}: chunk {}/{} skipped", job.task_id, index + 1, total);
                }
                ParseOutcome::Malformed(reason) => {
                    tracing::warn!(
                        "Task {}: chunk {}/{} unusable ({}), continuing",
                        job.task_id,
                        index + 1,
                        total,
                        reason
                    );
                }
            }

            let progress = (index + 1) as f64 / total as f64;
            if let Err(e) = self.registry.set_progress(&job.task_id, progress) {
                tracing::debug!("Task {}: progress not recorded: {}", job.task_id, e);
            }
        }

        self.db.save_records(&job.md5_name, job.flavor, &records)?;
        Ok(JobOutcome::Stored(records.len()))
    }

    async fn extract(&self, job: &ExtractionJob) -> Result<JobOutcome> {
        let path = self.upload_path(&job.md5_name, &job.extension);
        if !upload_exists(&path).await {
            tracing::debug!("Uploaded file does not exist: {}", path.display());
            return Err(Error::DocumentNotFound(MISSING_UPLOAD_MESSAGE.to_string()));
        }

        if self.db.has_elements(&job.md5_name)? {
            tracing::debug!("Text already extracted for {}, skipping", job.md5_name);
            return Ok(JobOutcome::AlreadyStored);
        }

        let data = tokio::fs::read(&path).await?;
        let filename = format!("{}.{}", job.md5_name, job.extension);

        let elements = self
            .extraction_limiter
            .run(self.extractor.extract(&filename, data))
            .await??;

        self.db.save_elements(&job.md5_name, &elements)?;
        Ok(JobOutcome::Stored(elements.len()))
    }

    fn complete(&self, task_id: &str, outcome: &JobOutcome) {
        match outcome {
            JobOutcome::AlreadyStored => tracing::info!("Task {} completed from stored results", task_id),
            JobOutcome::Stored(count) => tracing::info!("Task {} completed: {} item(s) stored", task_id, count),
        }
        self.registry.set_status(task_id, TaskStatus::Completed);
    }

    /// Attach the failure to the task, then flip it to `error` so callbacks
    /// on `error` see the attributes
    fn fail(&self, task_id: &str, error: &Error) {
        tracing::error!("Task {} failed: {}", task_id, error);

        let message = error_message(error);
        let attached = self
            .registry
            .set_attribute(task_id, "error_msg", message.clone())
            .and_then(|_| {
                self.registry
                    .set_attribute(task_id, "error_type", error.error_type())
            });

        match attached {
            Ok(()) => self.registry.set_status(task_id, TaskStatus::Error),
            Err(TaskError::UnknownTask(_)) => {
                // Reaped mid-run: recreate it so a late poll still sees the failure
                self.registry.set_status(task_id, TaskStatus::Error);
                let _ = self.registry.set_attribute(task_id, "error_msg", message);
                let _ = self
                    .registry
                    .set_attribute(task_id, "error_type", error.error_type());
            }
            Err(e) => tracing::warn!("Task {}: failure details not attached: {}", task_id, e),
        }
    }
}

/// User-facing text for a failed task
fn error_message(error: &Error) -> String {
    match error {
        Error::DocumentNotFound(message) => message.clone(),
        other => other.to_string(),
    }
}

async fn upload_exists(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}
