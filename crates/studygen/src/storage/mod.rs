//! Storage module for persistent data storage
//!
//! Provides SQLite-based persistence for extracted documents and generated
//! conversions.

mod database;

pub use database::{ResultsDb, StoredConversion};
