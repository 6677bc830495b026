//! studygen: background conversion of documents into study material
//!
//! Uploaded documents are run through a text extraction service, split into
//! bounded chunks and sent to a generation model. The free-form output is
//! parsed into deduplicated flashcards, keyword definitions or test
//! questions. Every conversion is a task in an in-memory registry that
//! clients poll for status and progress; idle and failed tasks are reaped in
//! the background.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod parsing;
pub mod processing;
pub mod providers;
pub mod server;
pub mod storage;
pub mod types;

pub use config::StudygenConfig;
pub use error::{Error, Result};
pub use processing::{TaskRegistry, TaskSnapshot, TaskStatus};
pub use types::{ConversionOptions, Flavor, StudyRecord};
