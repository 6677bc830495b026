//! SQLite store for extracted document elements and generated records
//!
//! Keyed by the upload's `md5_name`. Writes to one document's conversions go
//! through an IMMEDIATE transaction, so concurrent writers (threads or other
//! processes sharing the file) serialize on SQLite's write lock.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::ingestion::TextElement;
use crate::types::{Flavor, KeywordPair, QaPair, StudyRecord, TestQuestion};

/// Generated records for one `(md5_name, flavor)`
#[derive(Debug, Clone, PartialEq)]
pub struct StoredConversion {
    pub flavor: Flavor,
    pub records: Vec<StudyRecord>,
    pub data_length: usize,
    pub updated_at: DateTime<Utc>,
}

/// SQLite-backed results store
#[derive(Clone)]
pub struct ResultsDb {
    conn: Arc<Mutex<Connection>>,
}

impl ResultsDb {
    /// Create or open the database at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| Error::storage(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.migrate(true)?;
        Ok(db)
    }

    /// Create an in-memory database
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::storage(format!("Failed to open in-memory database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.migrate(false)?;
        Ok(db)
    }

    fn migrate(&self, on_disk: bool) -> Result<()> {
        let conn = self.conn.lock();

        if on_disk {
            conn.execute_batch(
                r#"
                PRAGMA journal_mode=WAL;
                PRAGMA synchronous=NORMAL;
                "#,
            )
            .map_err(|e| Error::storage(format!("Failed to set pragmas: {}", e)))?;
        }
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS extracted_documents (
                md5_name TEXT PRIMARY KEY,
                elements TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS conversions (
                md5_name TEXT NOT NULL,
                flavor TEXT NOT NULL,
                data TEXT NOT NULL,
                data_length INTEGER NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (md5_name, flavor)
            );
            "#,
        )
        .map_err(|e| Error::storage(format!("Failed to create tables: {}", e)))?;

        tracing::debug!("Database migrations complete");
        Ok(())
    }

    // ==================== Extracted Elements ====================

    /// Store the extraction result for a document, replacing any earlier one
    pub fn save_elements(&self, md5_name: &str, elements: &[TextElement]) -> Result<()> {
        let json = serde_json::to_string(elements)?;
        let conn = self.conn.lock();

        conn.execute(
            r#"
            INSERT INTO extracted_documents (md5_name, elements, created_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(md5_name) DO UPDATE SET
                elements = excluded.elements,
                created_at = excluded.created_at
            "#,
            params![md5_name, json, Utc::now().to_rfc3339()],
        )
        .map_err(|e| Error::storage(format!("Failed to save elements: {}", e)))?;

        Ok(())
    }

    pub fn load_elements(&self, md5_name: &str) -> Result<Option<Vec<TextElement>>> {
        let conn = self.conn.lock();

        let json: Option<String> = conn
            .query_row(
                "SELECT elements FROM extracted_documents WHERE md5_name = ?1",
                params![md5_name],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| Error::storage(format!("Failed to load elements: {}", e)))?;

        json.map(|raw| serde_json::from_str(&raw).map_err(Error::from))
            .transpose()
    }

    pub fn has_elements(&self, md5_name: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM extracted_documents WHERE md5_name = ?1",
            params![md5_name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // ==================== Conversions ====================

    /// Upsert the records generated for `(md5_name, flavor)`.
    ///
    /// Other flavors stored for the same document are untouched.
    pub fn save_records(
        &self,
        md5_name: &str,
        flavor: Flavor,
        records: &[StudyRecord],
    ) -> Result<()> {
        let json = serde_json::to_string(records)?;
        let mut conn = self.conn.lock();

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| Error::storage(format!("Failed to begin transaction: {}", e)))?;

        tx.execute(
            r#"
            INSERT INTO conversions (md5_name, flavor, data, data_length, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(md5_name, flavor) DO UPDATE SET
                data = excluded.data,
                data_length = excluded.data_length,
                updated_at = excluded.updated_at
            "#,
            params![
                md5_name,
                flavor.as_str(),
                json,
                records.len() as i64,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|e| Error::storage(format!("Failed to save records: {}", e)))?;

        tx.commit()
            .map_err(|e| Error::storage(format!("Failed to commit transaction: {}", e)))?;

        tracing::debug!("Stored {} {} records for {}", records.len(), flavor, md5_name);
        Ok(())
    }

    pub fn load_records(&self, md5_name: &str, flavor: Flavor) -> Result<Option<StoredConversion>> {
        let conn = self.conn.lock();

        let row: Option<(String, i64, String)> = conn
            .query_row(
                "SELECT data, data_length, updated_at FROM conversions WHERE md5_name = ?1 AND flavor = ?2",
                params![md5_name, flavor.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(|e| Error::storage(format!("Failed to load records: {}", e)))?;

        let Some((data, data_length, updated_at)) = row else {
            return Ok(None);
        };

        let records = decode_records(flavor, &data)?;
        let updated_at = DateTime::parse_from_rfc3339(&updated_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(Some(StoredConversion {
            flavor,
            records,
            data_length: data_length as usize,
            updated_at,
        }))
    }

    pub fn has_conversion(&self, md5_name: &str, flavor: Flavor) -> Result<bool> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM conversions WHERE md5_name = ?1 AND flavor = ?2",
            params![md5_name, flavor.as_str()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Record counts per generated flavor of a document
    pub fn data_lengths(&self, md5_name: &str) -> Result<HashMap<String, usize>> {
        let conn = self.conn.lock();

        let mut stmt = conn
            .prepare("SELECT flavor, data_length FROM conversions WHERE md5_name = ?1")
            .map_err(|e| Error::storage(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![md5_name], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })
            .map_err(|e| Error::storage(format!("Failed to query data lengths: {}", e)))?;

        let mut lengths = HashMap::new();
        for row in rows {
            let (flavor, length) = row?;
            lengths.insert(flavor, length as usize);
        }
        Ok(lengths)
    }
}

fn decode_records(flavor: Flavor, data: &str) -> Result<Vec<StudyRecord>> {
    let records = match flavor {
        Flavor::Flashcards => serde_json::from_str::<Vec<QaPair>>(data)?
            .into_iter()
            .map(StudyRecord::from)
            .collect(),
        Flavor::Keywords => serde_json::from_str::<Vec<KeywordPair>>(data)?
            .into_iter()
            .map(StudyRecord::from)
            .collect(),
        Flavor::Test => serde_json::from_str::<Vec<TestQuestion>>(data)?
            .into_iter()
            .map(StudyRecord::from)
            .collect(),
    };
    Ok(records)
}
