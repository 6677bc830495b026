//! In-memory task registry with progress, attributes and status callbacks
//!
//! Tasks are created implicitly by the first status write and removed only by
//! the stale reaper. Every read of a snapshot counts as activity, so a task
//! that is actively polled is never reaped for idleness.

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::TaskConfig;
use crate::error::Error;

use super::callbacks::CallbackRegistry;
use super::reaper::StaleReaper;
use super::task::{TaskEvent, TaskRecord, TaskSnapshot, TaskStatus};

/// Rejected registry writes. Reported to the caller and logged; never applied.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TaskError {
    #[error("task not created: {0}")]
    UnknownTask(String),
    #[error("progress out of bounds (0-1): {0}")]
    ProgressOutOfRange(f64),
}

impl From<TaskError> for Error {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::UnknownTask(id) => Error::TaskNotFound(id),
            other => Error::Validation(other.to_string()),
        }
    }
}

/// Shared handle to the task registry
#[derive(Clone)]
pub struct TaskRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    tasks: DashMap<String, TaskRecord>,
    callbacks: CallbackRegistry,
    config: TaskConfig,
    /// Latch: the reaper is started at most once
    reaper_started: AtomicBool,
    reaper: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for RegistryInner {
    fn drop(&mut self) {
        if let Some(handle) = self.reaper.get_mut().take() {
            handle.abort();
        }
    }
}

/// Non-owning handle held by the reaper
#[derive(Clone)]
pub struct WeakTaskRegistry {
    inner: Weak<RegistryInner>,
}

impl WeakTaskRegistry {
    pub fn upgrade(&self) -> Option<TaskRegistry> {
        self.inner.upgrade().map(|inner| TaskRegistry { inner })
    }
}

impl TaskRegistry {
    /// Create an empty registry. The reaper starts with the first task.
    pub fn new(config: TaskConfig) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                tasks: DashMap::new(),
                callbacks: CallbackRegistry::new(),
                config,
                reaper_started: AtomicBool::new(false),
                reaper: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &TaskConfig {
        &self.inner.config
    }

    pub fn downgrade(&self) -> WeakTaskRegistry {
        WeakTaskRegistry {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Set a task's status, creating the task if needed.
    ///
    /// `completed` forces progress to 1.0. Callbacks registered for this
    /// status fire after the record is updated. An empty id is ignored.
    pub fn set_status(&self, task_id: &str, status: impl Into<TaskStatus>) {
        if task_id.is_empty() {
            tracing::debug!("Ignoring status write for empty task id");
            return;
        }

        let status = status.into();
        {
            let mut record = self
                .inner
                .tasks
                .entry(task_id.to_string())
                .or_insert_with(|| TaskRecord::new(task_id));
            record.status = Some(status.clone());
            record.touch();
            if status == TaskStatus::Completed {
                record.progress = 1.0;
            }
        }
        tracing::debug!("Task {} status -> {}", task_id, status);

        self.ensure_reaper();

        self.inner
            .callbacks
            .trigger(&TaskEvent::transition(task_id, status));
    }

    /// Current status without counting as activity
    pub fn status(&self, task_id: &str) -> Option<TaskStatus> {
        self.inner
            .tasks
            .get(task_id)
            .and_then(|record| record.status.clone())
    }

    /// Status, progress and attributes for a polling client.
    ///
    /// Refreshes the task's idle clock. `None` means unknown or expired.
    pub fn snapshot(&self, task_id: &str) -> Option<TaskSnapshot> {
        self.inner.tasks.get_mut(task_id).map(|mut record| {
            record.touch();
            record.snapshot()
        })
    }

    /// Set progress in `[0, 1]` for an existing task
    pub fn set_progress(&self, task_id: &str, progress: f64) -> Result<(), TaskError> {
        let Some(mut record) = self.inner.tasks.get_mut(task_id) else {
            tracing::warn!("Setting task progress when task not created: {}", task_id);
            return Err(TaskError::UnknownTask(task_id.to_string()));
        };

        if !(0.0..=1.0).contains(&progress) {
            tracing::warn!("Setting task progress out of bounds (0-1): {}", progress);
            return Err(TaskError::ProgressOutOfRange(progress));
        }

        record.progress = progress;
        tracing::debug!("Task {} progress -> {:.3}", task_id, progress);
        Ok(())
    }

    pub fn attribute(&self, task_id: &str, key: &str) -> Option<serde_json::Value> {
        self.inner
            .tasks
            .get(task_id)
            .and_then(|record| record.attributes.get(key).cloned())
    }

    /// Attach out-of-band metadata to an existing task
    pub fn set_attribute(
        &self,
        task_id: &str,
        key: &str,
        value: impl Into<serde_json::Value>,
    ) -> Result<(), TaskError> {
        match self.inner.tasks.get_mut(task_id) {
            Some(mut record) => {
                record.attributes.insert(key.to_string(), value.into());
                Ok(())
            }
            None => {
                tracing::debug!("Attribute '{}' dropped, task {} not created", key, task_id);
                Err(TaskError::UnknownTask(task_id.to_string()))
            }
        }
    }

    /// Run `callback` once when `task_id` reaches `status`.
    ///
    /// All callbacks waiting on the same `(task_id, status)` fire together the
    /// first time that status is reached, then the bucket is cleared.
    pub fn on_status<F>(&self, task_id: &str, status: impl Into<TaskStatus>, callback: F)
    where
        F: FnOnce(&TaskEvent) + Send + 'static,
    {
        self.inner
            .callbacks
            .add(task_id, status.into(), Box::new(callback));
    }

    /// Await `status` on `task_id`.
    ///
    /// The receiver errors if the task is reaped without reaching `status`.
    pub fn wait_for(
        &self,
        task_id: &str,
        status: impl Into<TaskStatus>,
    ) -> oneshot::Receiver<TaskEvent> {
        let (sender, receiver) = oneshot::channel();
        self.on_status(task_id, status, move |event| {
            let _ = sender.send(event.clone());
        });
        receiver
    }

    /// Callbacks still pending for a task
    pub fn pending_callbacks(&self, task_id: &str) -> usize {
        self.inner.callbacks.pending(task_id)
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.inner.tasks.contains_key(task_id)
    }

    pub fn len(&self) -> usize {
        self.inner.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.tasks.is_empty()
    }

    /// One reaper pass: remove errored and idle tasks.
    ///
    /// Each removed task first fires the callbacks registered for its current
    /// status. Waiters registered for any other status are dropped unfired.
    /// Returns the removed ids.
    pub fn reap_stale(&self) -> Vec<String> {
        let now = Instant::now();
        let stale_after = self.inner.config.stale_timeout();

        tracing::debug!("Checking for stale tasks of current: {} tasks", self.len());

        let candidates: Vec<(String, Option<TaskStatus>)> = self
            .inner
            .tasks
            .iter()
            .filter(|entry| entry.is_reapable(now, stale_after))
            .map(|entry| (entry.key().clone(), entry.status.clone()))
            .collect();

        if candidates.is_empty() {
            return Vec::new();
        }

        tracing::info!("Found {} stale tasks. Removing...", candidates.len());

        let mut removed = Vec::with_capacity(candidates.len());
        for (task_id, status) in candidates {
            if let Some(status) = status {
                self.inner
                    .callbacks
                    .trigger(&TaskEvent::reaped(task_id.clone(), status));
            }

            // A poll during the callbacks revives an idle task
            let gone = self
                .inner
                .tasks
                .remove_if(&task_id, |_, record| record.is_reapable(now, stale_after))
                .is_some();

            if gone {
                let dropped = self.inner.callbacks.discard(&task_id);
                if dropped > 0 {
                    tracing::debug!(
                        "Dropped {} unfired callback(s) for reaped task {}",
                        dropped,
                        task_id
                    );
                }
                removed.push(task_id);
            }
        }

        removed
    }

    /// Stop the reaper loop. It is not restarted afterwards.
    pub fn shutdown_reaper(&self) {
        self.inner.reaper_started.store(true, Ordering::SeqCst);
        if let Some(handle) = self.inner.reaper.lock().take() {
            handle.abort();
            tracing::info!("Stale task reaper stopped");
        }
    }

    pub fn reaper_running(&self) -> bool {
        self.inner
            .reaper
            .lock()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Counts by status
    pub fn stats(&self) -> RegistryStats {
        let mut stats = RegistryStats {
            total_tasks: self.len(),
            ..Default::default()
        };
        for entry in self.inner.tasks.iter() {
            match entry.status {
                Some(TaskStatus::Processing) => stats.processing += 1,
                Some(TaskStatus::Completed) => stats.completed += 1,
                Some(TaskStatus::Error) => stats.error += 1,
                _ => stats.other += 1,
            }
        }
        stats
    }

    fn ensure_reaper(&self) {
        if self.inner.reaper_started.load(Ordering::Acquire) {
            return;
        }
        if tokio::runtime::Handle::try_current().is_err() {
            tracing::debug!("No async runtime; stale task reaper not started yet");
            return;
        }
        if self
            .inner
            .reaper_started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let handle = StaleReaper::new(self).spawn();
        *self.inner.reaper.lock() = Some(handle);
    }
}

/// Registry statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegistryStats {
    pub total_tasks: usize,
    pub processing: usize,
    pub completed: usize,
    pub error: usize,
    pub other: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn registry() -> TaskRegistry {
        TaskRegistry::new(TaskConfig::default())
    }

    #[test]
    fn test_set_status_creates_task() {
        let registry = registry();
        assert!(registry.status("t1").is_none());

        registry.set_status("t1", "processing");
        assert_eq!(registry.status("t1"), Some(TaskStatus::Processing));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_empty_task_id_ignored() {
        let registry = registry();
        registry.set_status("", TaskStatus::Processing);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_completed_forces_full_progress() {
        let registry = registry();
        registry.set_status("t1", TaskStatus::Processing);
        registry.set_progress("t1", 0.25).unwrap();

        registry.set_status("t1", TaskStatus::Completed);
        assert_eq!(registry.snapshot("t1").unwrap().progress, 1.0);
    }

    #[test]
    fn test_progress_validation() {
        let registry = registry();
        assert_eq!(
            registry.set_progress("missing", 0.5),
            Err(TaskError::UnknownTask("missing".to_string()))
        );

        registry.set_status("t1", TaskStatus::Processing);
        registry.set_progress("t1", 0.4).unwrap();

        assert_eq!(
            registry.set_progress("t1", 1.5),
            Err(TaskError::ProgressOutOfRange(1.5))
        );
        assert!(registry.set_progress("t1", -0.1).is_err());
        assert!(registry.set_progress("t1", f64::NAN).is_err());
        assert_eq!(registry.snapshot("t1").unwrap().progress, 0.4);

        registry.set_progress("t1", 0.0).unwrap();
        registry.set_progress("t1", 1.0).unwrap();
        assert_eq!(registry.snapshot("t1").unwrap().progress, 1.0);
    }

    #[test]
    fn test_attributes() {
        let registry = registry();
        assert!(registry.set_attribute("t1", "md5_name", "abc").is_err());
        assert!(registry.attribute("t1", "md5_name").is_none());

        registry.set_status("t1", TaskStatus::Processing);
        registry.set_attribute("t1", "md5_name", "abc").unwrap();
        registry.set_attribute("t1", "pages", 12).unwrap();

        assert_eq!(registry.attribute("t1", "md5_name"), Some(serde_json::json!("abc")));
        let snapshot = registry.snapshot("t1").unwrap();
        assert_eq!(snapshot.attributes["pages"], serde_json::json!(12));
    }

    #[test]
    fn test_callback_fires_once_across_repeated_status() {
        let registry = registry();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        registry.on_status("t1", TaskStatus::Completed, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        registry.set_status("t1", TaskStatus::Completed);
        registry.set_status("t1", TaskStatus::Completed);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_callback_may_reenter_registry() {
        let registry = registry();
        let handle = registry.clone();

        registry.on_status("t1", TaskStatus::Error, move |event| {
            handle
                .set_attribute(&event.task_id, "seen_error", true)
                .unwrap();
        });
        registry.set_status("t1", TaskStatus::Error);

        assert_eq!(registry.attribute("t1", "seen_error"), Some(serde_json::json!(true)));
    }

    #[tokio::test]
    async fn test_wait_for() {
        let registry = registry();
        let waiter = registry.wait_for("t1", TaskStatus::Completed);

        registry.set_status("t1", TaskStatus::Processing);
        registry.set_status("t1", TaskStatus::Completed);

        let event = waiter.await.unwrap();
        assert_eq!(event.status, TaskStatus::Completed);
        assert_eq!(event.task_id, "t1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reap_idle_and_errored() {
        let registry = registry();
        registry.shutdown_reaper();

        registry.set_status("idle", TaskStatus::Processing);
        registry.set_status("polled", TaskStatus::Processing);
        registry.set_status("failed", TaskStatus::Error);

        // Errored tasks go on the next pass regardless of age
        assert_eq!(registry.reap_stale(), vec!["failed".to_string()]);

        tokio::time::advance(Duration::from_secs(8)).await;
        registry.snapshot("polled");
        tokio::time::advance(Duration::from_secs(3)).await;

        assert_eq!(registry.reap_stale(), vec!["idle".to_string()]);
        assert!(registry.contains("polled"));
        assert!(!registry.contains("idle"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_task_reaped_only_when_idle() {
        let registry = registry();
        registry.shutdown_reaper();

        registry.set_status("t1", TaskStatus::Completed);
        assert!(registry.reap_stale().is_empty());

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(registry.reap_stale(), vec!["t1".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reap_fires_current_status_only() {
        let registry = registry();
        registry.shutdown_reaper();
        registry.set_status("t1", TaskStatus::Processing);

        let on_processing = registry.wait_for("t1", TaskStatus::Processing);
        let on_completed = registry.wait_for("t1", TaskStatus::Completed);

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(registry.reap_stale().len(), 1);

        let event = on_processing.await.unwrap();
        assert_eq!(event.cause, crate::processing::EventCause::Reaped);

        // Never reached `completed`: the waiter is dropped, not notified
        assert!(on_completed.await.is_err());
        assert_eq!(registry.pending_callbacks("t1"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_reaper_started_once() {
        let registry = registry();
        registry.set_status("t1", TaskStatus::Processing);
        assert!(registry.reaper_running());

        registry.set_status("t2", TaskStatus::Processing);
        assert!(registry.reaper_running());

        // Scans at t=0, 10, 20: both tasks are idle past 10s by the third one
        tokio::time::sleep(Duration::from_secs(21)).await;
        assert!(registry.is_empty());

        registry.shutdown_reaper();
        assert!(!registry.reaper_running());
    }

    #[test]
    fn test_stats() {
        let registry = registry();
        registry.set_status("a", TaskStatus::Processing);
        registry.set_status("b", TaskStatus::Completed);
        registry.set_status("c", "exporting");

        let stats = registry.stats();
        assert_eq!(stats.total_tasks, 3);
        assert_eq!(stats.processing, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.other, 1);
    }
}
