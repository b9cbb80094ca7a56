//! Capability roles and the resolved caller of an operation.

use super::{ParseStatusError, ParticipantId, TaskDomainError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Capability role held by a participant.
///
/// A participant holds at most one role for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Posts and pays for tasks.
    Provider,
    /// Executes tasks.
    Developer,
    /// Arbitrates disputes.
    Auditor,
}

impl Role {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Provider => "provider",
            Self::Developer => "developer",
            Self::Auditor => "auditor",
        }
    }
}

impl TryFrom<&str> for Role {
    type Error = ParseStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "provider" => Ok(Self::Provider),
            "developer" => Ok(Self::Developer),
            "auditor" => Ok(Self::Auditor),
            _ => Err(ParseStatusError {
                kind: "role",
                value: value.to_owned(),
            }),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A participant together with the role the role gate reported for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    participant: ParticipantId,
    role: Option<Role>,
}

impl Actor {
    /// Creates an actor from a participant and its resolved role.
    #[must_use]
    pub const fn new(participant: ParticipantId, role: Option<Role>) -> Self {
        Self { participant, role }
    }

    /// Returns the participant identifier.
    #[must_use]
    pub const fn participant(&self) -> &ParticipantId {
        &self.participant
    }

    /// Returns the role held, if any.
    #[must_use]
    pub const fn role(&self) -> Option<Role> {
        self.role
    }

    /// Ensures the actor holds `required`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::WrongRole`] otherwise.
    pub fn require(&self, required: Role) -> Result<(), TaskDomainError> {
        if self.role == Some(required) {
            return Ok(());
        }
        Err(TaskDomainError::WrongRole {
            participant: self.participant.clone(),
            required,
            actual: self.role,
        })
    }

    /// Ensures the actor holds some role and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::RoleRequired`] for role-less participants.
    pub fn require_any(&self) -> Result<Role, TaskDomainError> {
        self.role
            .ok_or_else(|| TaskDomainError::RoleRequired(self.participant.clone()))
    }
}
