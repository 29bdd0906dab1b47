//! Index Publisher
//!
//! Publishes an enriched batch in three dependent steps:
//! 1. Apply index settings (failure aborts before any write)
//! 2. Submit the batch write; the acknowledgment must carry a task id
//! 3. Poll the task until the backend reports it published
//!
//! There is no automatic retry of steps 1 and 2. Retry policy belongs to the
//! caller.

use crate::error::IndexError;
use crate::services::{IndexBackend, IndexSettings, TaskStatus};
use crate::types::EnrichedRecord;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Bounded polling with exponential backoff
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Wait after the first unpublished status
    pub initial_delay: Duration,
    /// Growth factor applied per attempt
    pub multiplier: f64,
    /// Upper bound on a single wait
    pub max_delay: Duration,
    /// Status checks before giving up
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(200),
            multiplier: 2.0,
            max_delay: Duration::from_secs(5),
            max_attempts: 50,
        }
    }
}

impl PollPolicy {
    /// Poll without waiting between checks
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            initial_delay: Duration::ZERO,
            multiplier: 1.0,
            max_delay: Duration::ZERO,
            max_attempts,
        }
    }

    /// Wait after the given (0-based) unpublished check
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt.min(i32::MAX as u32) as i32);
        let millis = self.initial_delay.as_millis() as f64 * factor;
        let capped = millis.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }
}

/// Lifecycle of an indexing task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Submitted,
    Confirmed,
    Failed(String),
}

/// In-flight write, awaited to a terminal state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexingTask {
    pub index_name: String,
    pub task_id: u64,
    pub state: TaskState,
    pub polls: u32,
}

impl IndexingTask {
    pub fn submitted(index_name: impl Into<String>, task_id: u64) -> Self {
        Self {
            index_name: index_name.into(),
            task_id,
            state: TaskState::Submitted,
            polls: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self.state, TaskState::Submitted)
    }

    /// Apply one status check; terminal states do not change
    pub fn observe(&mut self, status: TaskStatus) {
        if self.is_terminal() {
            return;
        }
        self.polls += 1;
        if status == TaskStatus::Published {
            self.state = TaskState::Confirmed;
        }
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        if !self.is_terminal() {
            self.state = TaskState::Failed(reason.into());
        }
    }

    fn into_error(self) -> IndexError {
        let reason = match self.state {
            TaskState::Failed(reason) => reason,
            TaskState::Submitted => "task still pending".to_string(),
            TaskState::Confirmed => "task confirmed".to_string(),
        };
        IndexError::Task {
            index: self.index_name,
            task_id: self.task_id,
            reason,
        }
    }
}

/// Confirmation of a durable publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedPublish {
    pub index_name: String,
    pub task_id: u64,
    pub record_count: usize,
    pub polls: u32,
}

/// Publishes enriched batches to an index backend
pub struct IndexPublisher {
    backend: Arc<dyn IndexBackend>,
    poll_policy: PollPolicy,
}

impl IndexPublisher {
    pub fn new(backend: Arc<dyn IndexBackend>) -> Self {
        Self::with_poll_policy(backend, PollPolicy::default())
    }

    pub fn with_poll_policy(backend: Arc<dyn IndexBackend>, poll_policy: PollPolicy) -> Self {
        Self {
            backend,
            poll_policy,
        }
    }

    /// Configure the index, write the batch, and wait for confirmation
    pub async fn publish(
        &self,
        index_name: &str,
        settings: &IndexSettings,
        records: &[EnrichedRecord],
    ) -> Result<ConfirmedPublish, IndexError> {
        info!(index = %index_name, "Configuring index");
        self.backend
            .set_settings(index_name, settings)
            .await
            .map_err(|e| IndexError::Config {
                index: index_name.to_string(),
                message: e.to_string(),
            })?;
        info!(index = %index_name, "Index settings updated");

        info!(index = %index_name, count = records.len(), "Submitting batch write");
        let ack = self
            .backend
            .save_objects(index_name, records)
            .await
            .map_err(|e| IndexError::Write {
                index: index_name.to_string(),
                message: e.to_string(),
                raw_response: None,
            })?;

        let Some(task_id) = ack.task_id else {
            error!(
                index = %index_name,
                response = %ack.raw,
                "Batch write returned no task id"
            );
            return Err(IndexError::Write {
                index: index_name.to_string(),
                message: "missing task id".to_string(),
                raw_response: Some(ack.raw),
            });
        };

        info!(index = %index_name, task_id, "Indexing task submitted, waiting for completion");
        let task = self.await_task(IndexingTask::submitted(index_name, task_id)).await?;

        info!(index = %index_name, task_id, polls = task.polls, "Indexing task confirmed");
        Ok(ConfirmedPublish {
            index_name: task.index_name,
            task_id,
            record_count: records.len(),
            polls: task.polls,
        })
    }

    /// Poll until the task is terminal or the attempt budget runs out
    async fn await_task(&self, mut task: IndexingTask) -> Result<IndexingTask, IndexError> {
        for attempt in 0..self.poll_policy.max_attempts {
            match self.backend.task_status(&task.index_name, task.task_id).await {
                Ok(status) => task.observe(status),
                Err(e) => task.fail(e.to_string()),
            }

            if task.state == TaskState::Confirmed {
                return Ok(task);
            }
            if task.is_terminal() {
                return Err(task.into_error());
            }

            if attempt + 1 < self.poll_policy.max_attempts {
                let delay = self.poll_policy.delay_for(attempt);
                debug!(task_id = task.task_id, delay_ms = delay.as_millis() as u64, "Task pending");
                tokio::time::sleep(delay).await;
            }
        }

        let attempts = self.poll_policy.max_attempts;
        task.fail(format!("not published after {} status checks", attempts));
        Err(task.into_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_backoff_is_capped() {
        let policy = PollPolicy {
            initial_delay: Duration::from_millis(100),
            multiplier: 2.0,
            max_delay: Duration::from_millis(500),
            max_attempts: 10,
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for(3), Duration::from_millis(500));
        assert_eq!(policy.delay_for(40), Duration::from_millis(500));
    }

    #[test]
    fn test_immediate_policy_never_waits() {
        let policy = PollPolicy::immediate(3);
        assert_eq!(policy.delay_for(0), Duration::ZERO);
        assert_eq!(policy.delay_for(5), Duration::ZERO);
    }

    #[test]
    fn test_task_transitions() {
        let mut task = IndexingTask::submitted("works", 9);
        task.observe(TaskStatus::NotPublished);
        assert_eq!(task.state, TaskState::Submitted);
        task.observe(TaskStatus::Published);
        assert_eq!(task.state, TaskState::Confirmed);
        assert_eq!(task.polls, 2);

        // Terminal states are final
        task.fail("late error");
        assert_eq!(task.state, TaskState::Confirmed);
    }

    #[test]
    fn test_failed_task_error_names_index() {
        let mut task = IndexingTask::submitted("works", 9);
        task.fail("API error 500: boom");
        let err = task.into_error();
        assert!(matches!(err, IndexError::Task { task_id: 9, .. }));
        assert!(err.to_string().contains("'works'"));
        assert!(err.to_string().contains("boom"));
    }
}
