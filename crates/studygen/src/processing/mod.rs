//! Background processing: task registry, status callbacks, stale task
//! reaping, concurrency limits and the conversion driver

mod callbacks;
mod driver;
mod limiter;
mod reaper;
mod registry;
mod task;

pub use callbacks::{CallbackRegistry, StatusCallback};
pub use driver::{
    ConversionJob, ExtractionJob, JobOutcome, PipelineDriver, MISSING_UPLOAD_MESSAGE,
};
pub use limiter::{ConcurrencyLimiter, LimiterPermit};
pub use reaper::StaleReaper;
pub use registry::{RegistryStats, TaskError, TaskRegistry, WeakTaskRegistry};
pub use task::{EventCause, TaskEvent, TaskRecord, TaskSnapshot, TaskStatus};
