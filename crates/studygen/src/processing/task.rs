//! Task state: status values, the per-task record and the polling snapshot

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tokio::time::Instant;

/// Task status
///
/// The set is open: anything other than the three well-known values is kept
/// verbatim as `Custom`. Serialized as a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    Processing,
    Completed,
    Error,
    Custom(String),
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Error => "error",
            TaskStatus::Custom(s) => s,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for TaskStatus {
    fn from(s: &str) -> Self {
        match s {
            "processing" => TaskStatus::Processing,
            "completed" => TaskStatus::Completed,
            "error" => TaskStatus::Error,
            other => TaskStatus::Custom(other.to_string()),
        }
    }
}

impl From<String> for TaskStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "processing" | "completed" | "error" => TaskStatus::from(s.as_str()),
            _ => TaskStatus::Custom(s),
        }
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Custom(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

/// State of one tracked task. Only the registry holds these.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub task_id: String,
    /// `None` until the first status write
    pub status: Option<TaskStatus>,
    /// Always within `[0.0, 1.0]`
    pub progress: f64,
    /// Refreshed on every status read or write
    pub last_activity: Instant,
    pub attributes: HashMap<String, serde_json::Value>,
}

impl TaskRecord {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            status: None,
            progress: 0.0,
            last_activity: Instant::now(),
            attributes: HashMap::new(),
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Reap eligibility: errored, or idle for longer than `stale_after`
    pub fn is_reapable(&self, now: Instant, stale_after: std::time::Duration) -> bool {
        self.status == Some(TaskStatus::Error)
            || now.saturating_duration_since(self.last_activity) > stale_after
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            status: self.status.clone(),
            progress: self.progress,
            attributes: self.attributes.clone(),
        }
    }
}

/// What a polling client sees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub status: Option<TaskStatus>,
    pub progress: f64,
    pub attributes: HashMap<String, serde_json::Value>,
}

/// Why a status event was emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCause {
    /// A status write
    Transition,
    /// The reaper removed the task
    Reaped,
}

/// Event delivered to status callbacks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEvent {
    pub task_id: String,
    pub status: TaskStatus,
    pub cause: EventCause,
}

impl TaskEvent {
    pub fn transition(task_id: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            task_id: task_id.into(),
            status,
            cause: EventCause::Transition,
        }
    }

    pub fn reaped(task_id: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            task_id: task_id.into(),
            status,
            cause: EventCause::Reaped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_round_trip_strings() {
        assert_eq!(TaskStatus::from("completed"), TaskStatus::Completed);
        assert_eq!(
            TaskStatus::from("uploading".to_string()),
            TaskStatus::Custom("uploading".to_string())
        );
        assert_eq!(String::from(TaskStatus::Error), "error");

        let json = serde_json::to_string(&TaskStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
        let parsed: TaskStatus = serde_json::from_str("\"exporting\"").unwrap();
        assert_eq!(parsed, TaskStatus::Custom("exporting".to_string()));
    }

    #[test]
    fn test_snapshot_serializes_null_status() {
        let record = TaskRecord::new("t1");
        let value = serde_json::to_value(record.snapshot()).unwrap();
        assert!(value["status"].is_null());
        assert_eq!(value["progress"], 0.0);
        assert!(value["attributes"].as_object().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reapable() {
        let stale_after = Duration::from_secs(10);
        let mut record = TaskRecord::new("t1");
        record.status = Some(TaskStatus::Processing);
        assert!(!record.is_reapable(Instant::now(), stale_after));

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(!record.is_reapable(Instant::now(), stale_after));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(record.is_reapable(Instant::now(), stale_after));

        record.touch();
        assert!(!record.is_reapable(Instant::now(), stale_after));

        record.status = Some(TaskStatus::Error);
        assert!(record.is_reapable(Instant::now(), stale_after));
    }
}
