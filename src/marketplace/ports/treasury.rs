//! Treasury port receiving protocol fees.

use crate::marketplace::domain::{Amount, TaskId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for treasury operations.
pub type TreasuryResult<T> = Result<T, TreasuryError>;

/// Destination of the protocol fee skimmed at task start.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Treasury: Send + Sync {
    /// Credits the fee collected when `task_id` started.
    async fn receive_fee(&self, task_id: TaskId, amount: Amount) -> TreasuryResult<()>;
}

/// Errors returned by treasury adapters.
#[derive(Debug, Clone, Error)]
pub enum TreasuryError {
    /// The treasury rejected or could not record the fee.
    #[error("treasury unavailable: {0}")]
    Unavailable(Arc<dyn std::error::Error + Send + Sync>),
}

impl TreasuryError {
    /// Wraps a treasury failure.
    pub fn unavailable(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Unavailable(Arc::new(err))
    }
}
