//! Repository port for task aggregate persistence and participant lookups.

use crate::marketplace::domain::{ParticipantId, Role, Task, TaskId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for task repository operations.
pub type TaskRepositoryResult<T> = Result<T, TaskRepositoryError>;

/// Task persistence contract.
///
/// Implementations keep three participant indexes in step with the stored
/// aggregate: tasks posted by a provider, tasks assigned to a developer and
/// tasks an auditor applied for.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Reserves the next sequential task identifier.
    ///
    /// Identifiers start at [`TaskId::FIRST`] and are never reused, even when
    /// the reserving operation later fails.
    async fn next_task_id(&self) -> TaskRepositoryResult<TaskId>;

    /// Stores a new task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::DuplicateTask`] when the task ID already
    /// exists.
    async fn store(&self, task: &Task) -> TaskRepositoryResult<()>;

    /// Persists changes to an existing task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] when the task does not exist.
    async fn update(&self, task: &Task) -> TaskRepositoryResult<()>;

    /// Finds a task by identifier.
    ///
    /// Returns `None` when the task does not exist.
    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>>;

    /// Returns every task ordered by identifier.
    async fn list_all(&self) -> TaskRepositoryResult<Vec<Task>>;

    /// Returns the number of stored tasks.
    async fn count(&self) -> TaskRepositoryResult<usize>;

    /// Returns the identifiers of tasks related to `participant` through
    /// `relation`, in ascending order.
    async fn find_ids_for(
        &self,
        participant: &ParticipantId,
        relation: Role,
    ) -> TaskRepositoryResult<Vec<TaskId>>;
}

/// Errors returned by task repository implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskRepositoryError {
    /// A task with the same identifier already exists.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(TaskId),

    /// The task was not found.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The identifier sequence is exhausted.
    #[error("task identifier sequence exhausted")]
    SequenceExhausted,

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
