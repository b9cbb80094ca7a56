//! Task lifecycle status and its transition table.

use super::ParseStatusError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Posted and open for applications.
    Created,
    /// Funded and being worked on.
    InProgress,
    /// Work delivered and awaiting the provider's verdict.
    Submitted,
    /// Acceptance contested; auditors are voting.
    Disputed,
    /// Work accepted without dispute.
    Completed,
    /// Forfeited after the deadline passed without submission.
    Cancelled,
    /// Auditors ruled for the developer.
    CompletedWithDeveloperWon,
    /// Auditors ruled for the provider.
    CompletedWithProviderWon,
}

impl TaskStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 8] = [
        Self::Created,
        Self::InProgress,
        Self::Submitted,
        Self::Disputed,
        Self::Completed,
        Self::Cancelled,
        Self::CompletedWithDeveloperWon,
        Self::CompletedWithProviderWon,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::InProgress => "in_progress",
            Self::Submitted => "submitted",
            Self::Disputed => "disputed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::CompletedWithDeveloperWon => "completed_with_developer_won",
            Self::CompletedWithProviderWon => "completed_with_provider_won",
        }
    }

    /// Returns `true` when the lifecycle permits moving to `target`.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Created, Self::InProgress | Self::Cancelled)
                | (
                    Self::InProgress,
                    Self::Submitted | Self::Completed | Self::Cancelled
                )
                | (Self::Submitted, Self::Completed | Self::Disputed)
                | (
                    Self::Disputed,
                    Self::CompletedWithDeveloperWon | Self::CompletedWithProviderWon
                )
        )
    }

    /// Returns `true` when no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed
                | Self::Cancelled
                | Self::CompletedWithDeveloperWon
                | Self::CompletedWithProviderWon
        )
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ParseStatusError {
                kind: "task status",
                value: value.to_owned(),
            })
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
