//! One-shot status callbacks keyed by task id
//!
//! A trigger for `(task_id, status)` fires every callback registered for that
//! pair, in registration order, and clears the whole bucket for that status.
//! Callbacks registered for other statuses of the same task stay pending.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use super::task::{TaskEvent, TaskStatus};

/// Callback invoked at most once with the event that triggered it
pub type StatusCallback = Box<dyn FnOnce(&TaskEvent) + Send + 'static>;

struct CallbackEntry {
    trigger: TaskStatus,
    callback: StatusCallback,
}

/// Pending callbacks for all tasks
#[derive(Default)]
pub struct CallbackRegistry {
    entries: Mutex<HashMap<String, Vec<CallbackEntry>>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` to run when `task_id` reaches `trigger`
    pub fn add(&self, task_id: &str, trigger: TaskStatus, callback: StatusCallback) {
        tracing::debug!("Added callback for task {} on status '{}'", task_id, trigger);
        self.entries
            .lock()
            .entry(task_id.to_string())
            .or_default()
            .push(CallbackEntry { trigger, callback });
    }

    /// Fire and clear the bucket matching the event's status.
    ///
    /// The bucket is detached under the lock and run without it, so callbacks
    /// may freely call back into the registry. A callback registered for the
    /// same task and status while the batch runs is not part of it; it stays
    /// pending until the next trigger for that status. A panicking callback
    /// is logged and does not stop the rest of the batch. Returns how many ran.
    pub fn trigger(&self, event: &TaskEvent) -> usize {
        let batch: Vec<CallbackEntry> = {
            let mut entries = self.entries.lock();
            let Some(pending) = entries.get_mut(&event.task_id) else {
                return 0;
            };

            let (batch, keep): (Vec<_>, Vec<_>) = std::mem::take(pending)
                .into_iter()
                .partition(|entry| entry.trigger == event.status);
            *pending = keep;
            if pending.is_empty() {
                entries.remove(&event.task_id);
            }
            batch
        };

        if batch.is_empty() {
            return 0;
        }

        tracing::debug!(
            "Triggering {} callback(s) for task {} on status '{}'",
            batch.len(),
            event.task_id,
            event.status
        );

        let fired = batch.len();
        for entry in batch {
            let callback = entry.callback;
            if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                tracing::error!(
                    "Callback for task {} on status '{}' panicked",
                    event.task_id,
                    event.status
                );
            }
        }
        fired
    }

    /// Drop every pending callback for a task without running it
    pub fn discard(&self, task_id: &str) -> usize {
        self.entries
            .lock()
            .remove(task_id)
            .map(|pending| pending.len())
            .unwrap_or(0)
    }

    /// Number of callbacks still waiting for a task
    pub fn pending(&self, task_id: &str) -> usize {
        self.entries
            .lock()
            .get(task_id)
            .map(|pending| pending.len())
            .unwrap_or(0)
    }
}
