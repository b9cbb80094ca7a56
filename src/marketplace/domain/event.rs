//! Domain events published after committed marketplace operations.

use super::{Amount, EscrowId, ParticipantId, Payout, PayoutKind, TaskId, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event emitted by the task registry once an operation has been persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketEvent {
    /// A provider posted a task.
    TaskCreated {
        /// Task identifier.
        task_id: TaskId,
        /// Posting provider.
        provider: ParticipantId,
        /// Announced reward.
        reward: Amount,
        /// Submission deadline.
        deadline: DateTime<Utc>,
    },
    /// A developer applied for a task.
    DeveloperApplied {
        /// Task identifier.
        task_id: TaskId,
        /// Applying developer.
        developer: ParticipantId,
    },
    /// An auditor applied for a task.
    AuditorApplied {
        /// Task identifier.
        task_id: TaskId,
        /// Applying auditor.
        auditor: ParticipantId,
    },
    /// The provider chose a developer.
    DeveloperAssigned {
        /// Task identifier.
        task_id: TaskId,
        /// Assigned developer.
        developer: ParticipantId,
    },
    /// The task was funded and its escrow opened.
    TaskStarted {
        /// Task identifier.
        task_id: TaskId,
        /// Opened escrow.
        escrow_id: EscrowId,
        /// Amount held by the escrow.
        escrowed: Amount,
        /// Auditors frozen onto the dispute panel.
        auditor_panel: Vec<ParticipantId>,
    },
    /// The task moved between lifecycle states.
    TaskStatusUpdated {
        /// Task identifier.
        task_id: TaskId,
        /// Previous status.
        from: TaskStatus,
        /// New status.
        to: TaskStatus,
    },
    /// The developer delivered the work.
    WorkSubmitted {
        /// Task identifier.
        task_id: TaskId,
        /// Delivering developer.
        developer: ParticipantId,
    },
    /// The provider accepted the work without dispute.
    WorkAccepted {
        /// Task identifier.
        task_id: TaskId,
    },
    /// A dispute was opened.
    DisputeInitiated {
        /// Task identifier.
        task_id: TaskId,
        /// Participant that opened the dispute.
        initiator: ParticipantId,
        /// End of the voting window.
        voting_deadline: DateTime<Utc>,
    },
    /// A panel auditor voted.
    AuditorVoteSubmitted {
        /// Task identifier.
        task_id: TaskId,
        /// Voting auditor.
        auditor: ParticipantId,
        /// Ballot value.
        in_favour_of_developer: bool,
    },
    /// The panel reached its verdict.
    DisputeResolved {
        /// Task identifier.
        task_id: TaskId,
        /// Whether the developer won.
        developer_won: bool,
    },
    /// The developer missed the deadline and was flagged.
    DeveloperPenalized {
        /// Task identifier.
        task_id: TaskId,
        /// Flagged developer.
        developer: ParticipantId,
    },
    /// The provider moved the deadline.
    TaskDeadlineUpdated {
        /// Task identifier.
        task_id: TaskId,
        /// New deadline.
        deadline: DateTime<Utc>,
    },
    /// The developer received its reward.
    DeveloperPaid {
        /// Task identifier.
        task_id: TaskId,
        /// Paid developer.
        developer: ParticipantId,
        /// Amount transferred.
        amount: Amount,
    },
    /// A majority auditor received its share.
    AuditorPaid {
        /// Task identifier.
        task_id: TaskId,
        /// Paid auditor.
        auditor: ParticipantId,
        /// Amount transferred.
        amount: Amount,
    },
    /// The provider received a refund.
    ProviderRefunded {
        /// Task identifier.
        task_id: TaskId,
        /// Refunded provider.
        provider: ParticipantId,
        /// Amount transferred.
        amount: Amount,
    },
}

impl MarketEvent {
    /// Builds the payment event matching a completed payout.
    #[must_use]
    pub fn paid(payout: &Payout) -> Self {
        let task_id = payout.task_id();
        let recipient = payout.recipient().clone();
        let amount = payout.amount();
        match payout.kind() {
            PayoutKind::DeveloperReward => Self::DeveloperPaid {
                task_id,
                developer: recipient,
                amount,
            },
            PayoutKind::AuditorShare => Self::AuditorPaid {
                task_id,
                auditor: recipient,
                amount,
            },
            PayoutKind::ProviderRefund => Self::ProviderRefunded {
                task_id,
                provider: recipient,
                amount,
            },
        }
    }

    /// Returns the task the event concerns.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        match self {
            Self::TaskCreated { task_id, .. }
            | Self::DeveloperApplied { task_id, .. }
            | Self::AuditorApplied { task_id, .. }
            | Self::DeveloperAssigned { task_id, .. }
            | Self::TaskStarted { task_id, .. }
            | Self::TaskStatusUpdated { task_id, .. }
            | Self::WorkSubmitted { task_id, .. }
            | Self::WorkAccepted { task_id }
            | Self::DisputeInitiated { task_id, .. }
            | Self::AuditorVoteSubmitted { task_id, .. }
            | Self::DisputeResolved { task_id, .. }
            | Self::DeveloperPenalized { task_id, .. }
            | Self::TaskDeadlineUpdated { task_id, .. }
            | Self::DeveloperPaid { task_id, .. }
            | Self::AuditorPaid { task_id, .. }
            | Self::ProviderRefunded { task_id, .. } => *task_id,
        }
    }
}
