//! Error types for marketplace domain validation and state transitions.

use super::{Amount, EscrowId, ParticipantId, PaymentStatus, Role, TaskId, TaskStatus};
use thiserror::Error;

/// Coarse classification of domain failures.
///
/// Every [`TaskDomainError`] maps onto exactly one kind so callers can decide
/// how to react (fix the caller, wait, or correct the input) without matching
/// individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller lacks the role or task relationship the operation needs.
    Authorization,
    /// Operation is invalid for the current task or escrow status.
    State,
    /// A bounded candidate set is full.
    Capacity,
    /// The action was already performed by this participant.
    Duplicate,
    /// A deadline or voting window rules the operation out.
    Timing,
    /// Amounts do not add up or no reward is owed.
    Accounting,
}

/// Errors returned by task, escrow and vote domain operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// The participant identifier is empty, contains whitespace or is too
    /// long.
    #[error("invalid participant identifier '{0}'")]
    InvalidParticipant(String),

    /// The caller does not hold the role the operation requires.
    #[error("{participant} must hold the {required} role, holds {actual:?}")]
    WrongRole {
        /// Participant that attempted the operation.
        participant: ParticipantId,
        /// Role the operation requires.
        required: Role,
        /// Role the participant actually holds, if any.
        actual: Option<Role>,
    },

    /// The caller holds no role at all.
    #[error("{0} holds no marketplace role")]
    RoleRequired(ParticipantId),

    /// The caller is not the provider that posted the task.
    #[error("{participant} is not the provider of task {task_id}")]
    NotTaskProvider {
        /// Task being operated on.
        task_id: TaskId,
        /// Participant that attempted the operation.
        participant: ParticipantId,
    },

    /// The caller is not the developer assigned to the task.
    #[error("{participant} is not the developer of task {task_id}")]
    NotTaskDeveloper {
        /// Task being operated on.
        task_id: TaskId,
        /// Participant that attempted the operation.
        participant: ParticipantId,
    },

    /// The caller is not on the task's auditor panel.
    #[error("{participant} is not an auditor of task {task_id}")]
    NotTaskAuditor {
        /// Task being operated on.
        task_id: TaskId,
        /// Participant that attempted the operation.
        participant: ParticipantId,
    },

    /// Only the task's provider or developer may open a dispute.
    #[error("{participant} is not authorized to dispute task {task_id}")]
    NotAuthorized {
        /// Task being operated on.
        task_id: TaskId,
        /// Participant that attempted the operation.
        participant: ParticipantId,
    },

    /// A provider attempted to withdraw instead of requesting a refund.
    #[error("role {role} cannot withdraw from task {task_id}")]
    InvalidWithdrawalRole {
        /// Task being operated on.
        task_id: TaskId,
        /// Role of the caller.
        role: Role,
    },

    /// A party other than the owning registry touched the escrow.
    #[error("escrow {0} only accepts instructions from its owning registry")]
    Unauthorized(EscrowId),

    /// The requested status change is not part of the lifecycle.
    #[error("task {task_id} cannot move from {from} to {to}")]
    InvalidStateTransition {
        /// Task being operated on.
        task_id: TaskId,
        /// Current status.
        from: TaskStatus,
        /// Requested status.
        to: TaskStatus,
    },

    /// The operation is not available in the task's current status.
    #[error("task {task_id} is {status}, cannot {operation}")]
    InvalidState {
        /// Task being operated on.
        task_id: TaskId,
        /// Current status.
        status: TaskStatus,
        /// Operation that was attempted.
        operation: &'static str,
    },

    /// No developer has applied for the task yet.
    #[error("task {0} has no developer candidates")]
    NoCandidates(TaskId),

    /// The developer being assigned never applied.
    #[error("{developer} has not applied for task {task_id}")]
    NotACandidate {
        /// Task being operated on.
        task_id: TaskId,
        /// Developer that was proposed.
        developer: ParticipantId,
    },

    /// The task cannot start before a developer is assigned.
    #[error("task {0} has no assigned developer")]
    DeveloperNotAssigned(TaskId),

    /// Too few auditors applied for the task to start.
    #[error("task {task_id} needs {required} auditors, has {actual}")]
    InsufficientAuditors {
        /// Task being operated on.
        task_id: TaskId,
        /// Panel size required.
        required: usize,
        /// Auditor candidates recorded.
        actual: usize,
    },

    /// Votes are only accepted while the task is disputed.
    #[error("task {0} is not disputed")]
    NotDisputed(TaskId),

    /// The task has not been started, so no escrow exists.
    #[error("task {0} has no escrow")]
    EscrowMissing(TaskId),

    /// A disbursement from the escrow is still being transferred.
    #[error("escrow {0} has a disbursement in flight")]
    DisbursementInFlight(EscrowId),

    /// Completion or rollback was requested with nothing in flight.
    #[error("escrow {0} has no disbursement in flight")]
    NoDisbursementInFlight(EscrowId),

    /// The escrow's payment outcome was already decided.
    #[error("escrow {escrow_id} payment status is already {status}")]
    PaymentAlreadySettled {
        /// Escrow being operated on.
        escrow_id: EscrowId,
        /// Outcome already recorded.
        status: PaymentStatus,
    },

    /// The candidate set for the task is full.
    #[error("task {task_id} reached its limit of {limit} {role} candidates")]
    CandidateLimitReached {
        /// Task being operated on.
        task_id: TaskId,
        /// Candidate role whose set is full.
        role: Role,
        /// Configured cap.
        limit: usize,
    },

    /// The participant already applied for the task.
    #[error("{participant} already applied for task {task_id}")]
    AlreadyApplied {
        /// Task being operated on.
        task_id: TaskId,
        /// Participant that applied twice.
        participant: ParticipantId,
    },

    /// The auditor already cast a ballot.
    #[error("{auditor} already voted on task {task_id}")]
    AlreadyVoted {
        /// Task being operated on.
        task_id: TaskId,
        /// Auditor that voted twice.
        auditor: ParticipantId,
    },

    /// The participant already withdrew its allocation.
    #[error("{participant} already withdrew from escrow {escrow_id}")]
    AlreadyWithdrawn {
        /// Escrow being operated on.
        escrow_id: EscrowId,
        /// Participant that withdrew twice.
        participant: ParticipantId,
    },

    /// The provider already received its refund.
    #[error("provider already refunded from escrow {0}")]
    AlreadyRefunded(EscrowId),

    /// The deadline lies in the past.
    #[error("deadline must be in the future")]
    InvalidDeadline,

    /// Work can no longer be submitted.
    #[error("deadline of task {0} has passed")]
    DeadlinePassed(TaskId),

    /// The deadline penalty cannot be applied yet.
    #[error("deadline of task {0} has not passed yet")]
    DeadlineNotReached(TaskId),

    /// The voting window closed.
    #[error("voting period of task {0} has ended")]
    VotingPeriodEnded(TaskId),

    /// Adding the voting period to the current time overflowed.
    #[error("voting deadline is out of range")]
    DeadlineOutOfRange,

    /// Rewards must be strictly positive.
    #[error("reward must be greater than zero")]
    InvalidReward,

    /// The amount paid in does not equal the announced reward.
    #[error("payment {actual} does not match announced reward {expected}")]
    PaymentMismatch {
        /// Amount required.
        expected: Amount,
        /// Amount supplied.
        actual: Amount,
    },

    /// The participant has nothing to collect under the current outcome.
    #[error("{participant} has no reward eligible in escrow {escrow_id}")]
    NoRewardEligible {
        /// Escrow being operated on.
        escrow_id: EscrowId,
        /// Participant that asked to be paid.
        participant: ParticipantId,
    },

    /// Paying the amount would exceed the escrowed balance.
    #[error("escrow {escrow_id} cannot pay {requested}, balance is {available}")]
    InsufficientEscrowBalance {
        /// Escrow being operated on.
        escrow_id: EscrowId,
        /// Amount requested.
        requested: Amount,
        /// Balance left in the escrow.
        available: Amount,
    },

    /// Fixed-point arithmetic overflowed.
    #[error("amount arithmetic overflowed")]
    AmountOverflow,
}

impl TaskDomainError {
    /// Returns the taxonomy bucket for this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidParticipant(_)
            | Self::WrongRole { .. }
            | Self::RoleRequired(_)
            | Self::NotTaskProvider { .. }
            | Self::NotTaskDeveloper { .. }
            | Self::NotTaskAuditor { .. }
            | Self::NotAuthorized { .. }
            | Self::InvalidWithdrawalRole { .. }
            | Self::Unauthorized(_) => ErrorKind::Authorization,
            Self::InvalidStateTransition { .. }
            | Self::InvalidState { .. }
            | Self::NoCandidates(_)
            | Self::NotACandidate { .. }
            | Self::DeveloperNotAssigned(_)
            | Self::InsufficientAuditors { .. }
            | Self::NotDisputed(_)
            | Self::EscrowMissing(_)
            | Self::DisbursementInFlight(_)
            | Self::NoDisbursementInFlight(_)
            | Self::PaymentAlreadySettled { .. } => ErrorKind::State,
            Self::CandidateLimitReached { .. } => ErrorKind::Capacity,
            Self::AlreadyApplied { .. }
            | Self::AlreadyVoted { .. }
            | Self::AlreadyWithdrawn { .. }
            | Self::AlreadyRefunded(_) => ErrorKind::Duplicate,
            Self::InvalidDeadline
            | Self::DeadlinePassed(_)
            | Self::DeadlineNotReached(_)
            | Self::VotingPeriodEnded(_)
            | Self::DeadlineOutOfRange => ErrorKind::Timing,
            Self::InvalidReward
            | Self::PaymentMismatch { .. }
            | Self::NoRewardEligible { .. }
            | Self::InsufficientEscrowBalance { .. }
            | Self::AmountOverflow => ErrorKind::Accounting,
        }
    }
}

/// Error returned while parsing lifecycle enums from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct ParseStatusError {
    /// Name of the enum being parsed.
    pub kind: &'static str,
    /// Rejected input.
    pub value: String,
}
