//! Reputation ports notified about task outcomes.
//!
//! Both ledgers are fire-and-forget collaborators: the registry logs their
//! failures and never rolls back a committed outcome because of them.

use crate::marketplace::domain::ParticipantId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for reputation notifications.
pub type ReputationResult<T> = Result<T, ReputationError>;

/// Receives completed-task notifications for developers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AchievementLedger: Send + Sync {
    /// Records that `developer` completed a task.
    async fn record_task_completed(&self, developer: &ParticipantId) -> ReputationResult<()>;
}

/// Receives strike notifications for developers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RedflagLedger: Send + Sync {
    /// Records that `developer` lost a dispute or missed a deadline.
    async fn record_lost_dispute(&self, developer: &ParticipantId) -> ReputationResult<()>;
}

/// Errors returned by reputation adapters.
#[derive(Debug, Clone, Error)]
pub enum ReputationError {
    /// The ledger could not record the notification.
    #[error("reputation ledger unavailable: {0}")]
    Unavailable(Arc<dyn std::error::Error + Send + Sync>),
}

impl ReputationError {
    /// Wraps a ledger failure.
    pub fn unavailable(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Unavailable(Arc::new(err))
    }
}
