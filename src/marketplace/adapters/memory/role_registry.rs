//! In-memory role registry.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::marketplace::{
    domain::{ParticipantId, Role},
    ports::{RoleGate, RoleGateError, RoleGateResult},
};

/// Thread-safe role registry granting each participant at most one role.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRoleRegistry {
    roles: Arc<RwLock<HashMap<ParticipantId, Role>>>,
}

impl InMemoryRoleRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants `role` to `participant`.
    ///
    /// # Errors
    ///
    /// Returns [`RoleGateError::AlreadyHoldsRole`] when the participant
    /// already holds any role, including the requested one.
    pub fn request_role(&self, participant: &ParticipantId, role: Role) -> RoleGateResult<()> {
        let mut roles = self.roles.write().map_err(|err| {
            RoleGateError::unavailable(std::io::Error::other(err.to_string()))
        })?;
        if let Some(held) = roles.get(participant) {
            return Err(RoleGateError::AlreadyHoldsRole {
                participant: participant.clone(),
                role: *held,
            });
        }
        roles.insert(participant.clone(), role);
        Ok(())
    }
}

#[async_trait]
impl RoleGate for InMemoryRoleRegistry {
    async fn role_of(&self, participant: &ParticipantId) -> RoleGateResult<Option<Role>> {
        let roles = self.roles.read().map_err(|err| {
            RoleGateError::unavailable(std::io::Error::other(err.to_string()))
        })?;
        Ok(roles.get(participant).copied())
    }
}
