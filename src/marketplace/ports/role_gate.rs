//! Role gate port resolving a participant's capability role.

use crate::marketplace::domain::{ParticipantId, Role};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for role gate operations.
pub type RoleGateResult<T> = Result<T, RoleGateError>;

/// Read-only view of the role-token registry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoleGate: Send + Sync {
    /// Returns the role `participant` holds, or `None` when it holds none.
    async fn role_of(&self, participant: &ParticipantId) -> RoleGateResult<Option<Role>>;
}

/// Errors returned by role gate adapters.
#[derive(Debug, Clone, Error)]
pub enum RoleGateError {
    /// The participant already holds a role and cannot request another.
    #[error("{participant} already holds the {role} role")]
    AlreadyHoldsRole {
        /// Requesting participant.
        participant: ParticipantId,
        /// Role already held.
        role: Role,
    },

    /// The role registry could not be consulted.
    #[error("role registry unavailable: {0}")]
    Unavailable(Arc<dyn std::error::Error + Send + Sync>),
}

impl RoleGateError {
    /// Wraps a lookup failure.
    pub fn unavailable(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Unavailable(Arc::new(err))
    }
}
