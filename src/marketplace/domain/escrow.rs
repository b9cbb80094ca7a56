//! Per-task escrow ledger and settlement math.
//!
//! An escrow is opened when a task starts and holds the reward minus the
//! protocol fee. It is the only place that decides who may be paid and how
//! much, and it only takes instructions from the registry that opened it.
//!
//! Disbursement is split into two steps so that accounting always precedes
//! the outward transfer: `begin_*` checks eligibility, marks the recipient as
//! paid and records the payout as in flight; `complete_disbursement` or
//! `revert_disbursement` closes it once the transfer outcome is known. While
//! a payout is in flight every other disbursement request is refused.

use super::{
    Amount, EscrowId, ParseStatusError, ParticipantId, RegistryId, RewardSplit, TaskDomainError,
    TaskId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Settlement outcome recorded on an escrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// No outcome recorded yet.
    None,
    /// The provider accepted the work without dispute.
    WorkAccepted,
    /// Auditors ruled for the developer.
    DeveloperWon,
    /// Auditors ruled for the provider.
    ProviderWon,
    /// The task was forfeited at its deadline.
    Cancelled,
}

impl PaymentStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::WorkAccepted => "work_accepted",
            Self::DeveloperWon => "developer_won",
            Self::ProviderWon => "provider_won",
            Self::Cancelled => "cancelled",
        }
    }
}

impl TryFrom<&str> for PaymentStatus {
    type Error = ParseStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "work_accepted" => Ok(Self::WorkAccepted),
            "developer_won" => Ok(Self::DeveloperWon),
            "provider_won" => Ok(Self::ProviderWon),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ParseStatusError {
                kind: "payment status",
                value: value.to_owned(),
            }),
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a payout is being made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutKind {
    /// The developer's reward.
    DeveloperReward,
    /// A majority auditor's share of the pool.
    AuditorShare,
    /// Funds returned to the provider.
    ProviderRefund,
}

/// A single disbursement from an escrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    escrow_id: EscrowId,
    task_id: TaskId,
    recipient: ParticipantId,
    amount: Amount,
    kind: PayoutKind,
}

impl Payout {
    /// Returns the paying escrow.
    #[must_use]
    pub const fn escrow_id(&self) -> EscrowId {
        self.escrow_id
    }

    /// Returns the task the escrow belongs to.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the participant being paid.
    #[must_use]
    pub const fn recipient(&self) -> &ParticipantId {
        &self.recipient
    }

    /// Returns the amount being paid.
    #[must_use]
    pub const fn amount(&self) -> Amount {
        self.amount
    }

    /// Returns why the payout is made.
    #[must_use]
    pub const fn kind(&self) -> PayoutKind {
        self.kind
    }
}

/// Parties and funding of a new escrow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscrowTerms {
    /// Registry that will own the escrow.
    pub owner: RegistryId,
    /// Task the escrow settles.
    pub task_id: TaskId,
    /// Provider that funded the task.
    pub provider: ParticipantId,
    /// Developer assigned to the task.
    pub developer: ParticipantId,
    /// Split frozen at task creation.
    pub split: RewardSplit,
    /// Funds handed to the escrow.
    pub deposit: Amount,
}

/// Escrow ledger for one started task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escrow {
    id: EscrowId,
    owner: RegistryId,
    task_id: TaskId,
    provider: ParticipantId,
    developer: ParticipantId,
    split: RewardSplit,
    held: Amount,
    disbursed: Amount,
    withdrawn: BTreeSet<ParticipantId>,
    disputed: bool,
    payment_status: PaymentStatus,
    majority_auditors: Vec<ParticipantId>,
    in_flight: Option<Payout>,
    opened_at: DateTime<Utc>,
}

impl Escrow {
    /// Opens an escrow funded with exactly the reward minus the protocol fee.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::PaymentMismatch`] when the deposit differs
    /// from the escrowed share of the reward.
    pub fn open(terms: EscrowTerms, opened_at: DateTime<Utc>) -> Result<Self, TaskDomainError> {
        let EscrowTerms {
            owner,
            task_id,
            provider,
            developer,
            split,
            deposit,
        } = terms;
        let expected = split.escrowed()?;
        if deposit != expected {
            return Err(TaskDomainError::PaymentMismatch {
                expected,
                actual: deposit,
            });
        }
        Ok(Self {
            id: EscrowId::new(),
            owner,
            task_id,
            provider,
            developer,
            split,
            held: deposit,
            disbursed: Amount::ZERO,
            withdrawn: BTreeSet::new(),
            disputed: false,
            payment_status: PaymentStatus::None,
            majority_auditors: Vec::new(),
            in_flight: None,
            opened_at,
        })
    }

    /// Returns the escrow identifier.
    #[must_use]
    pub const fn id(&self) -> EscrowId {
        self.id
    }

    /// Returns the owning registry.
    #[must_use]
    pub const fn owner(&self) -> RegistryId {
        self.owner
    }

    /// Returns the task this escrow settles.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the funding provider.
    #[must_use]
    pub const fn provider(&self) -> &ParticipantId {
        &self.provider
    }

    /// Returns the assigned developer.
    #[must_use]
    pub const fn developer(&self) -> &ParticipantId {
        &self.developer
    }

    /// Returns the amount deposited at opening.
    #[must_use]
    pub const fn held(&self) -> Amount {
        self.held
    }

    /// Returns the total paid out so far, including any payout in flight.
    #[must_use]
    pub const fn disbursed(&self) -> Amount {
        self.disbursed
    }

    /// Returns the funds still held.
    #[must_use]
    pub fn balance(&self) -> Amount {
        self.held.checked_sub(self.disbursed).unwrap_or(Amount::ZERO)
    }

    /// Returns the developer's frozen share.
    #[must_use]
    pub const fn developer_reward(&self) -> Amount {
        self.split.developer_reward()
    }

    /// Returns the pool shared by majority auditors.
    #[must_use]
    pub const fn auditor_pool(&self) -> Amount {
        self.split.auditor_pool()
    }

    /// Returns whether a dispute was opened.
    #[must_use]
    pub const fn is_disputed(&self) -> bool {
        self.disputed
    }

    /// Returns the recorded settlement outcome.
    #[must_use]
    pub const fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    /// Returns the auditors entitled to a pool share, in panel order.
    #[must_use]
    pub fn majority_auditors(&self) -> &[ParticipantId] {
        &self.majority_auditors
    }

    /// Returns `true` once `participant` has been paid.
    #[must_use]
    pub fn has_withdrawn(&self, participant: &ParticipantId) -> bool {
        self.withdrawn.contains(participant)
    }

    /// Returns the payout whose transfer has not been confirmed yet.
    #[must_use]
    pub const fn in_flight(&self) -> Option<&Payout> {
        self.in_flight.as_ref()
    }

    /// Returns when the escrow was opened.
    #[must_use]
    pub const fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    /// Flags the escrow as disputed.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::Unauthorized`] for a foreign registry and
    /// [`TaskDomainError::PaymentAlreadySettled`] once an outcome exists.
    pub fn mark_disputed(&mut self, caller: RegistryId) -> Result<(), TaskDomainError> {
        self.authorize(caller)?;
        self.ensure_unsettled()?;
        self.disputed = true;
        Ok(())
    }

    /// Records the settlement outcome.
    ///
    /// The outcome can be set once; it moves from [`PaymentStatus::None`] to
    /// a final value and never changes afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::Unauthorized`] for a foreign registry,
    /// [`TaskDomainError::PaymentAlreadySettled`] when an outcome exists, and
    /// [`TaskDomainError::DisbursementInFlight`] during a transfer.
    pub fn set_payment_status(
        &mut self,
        caller: RegistryId,
        status: PaymentStatus,
    ) -> Result<(), TaskDomainError> {
        self.authorize(caller)?;
        self.ensure_idle()?;
        self.ensure_unsettled()?;
        self.payment_status = status;
        Ok(())
    }

    /// Records a dispute verdict and the auditors who voted with it.
    ///
    /// # Errors
    ///
    /// Fails like [`Escrow::set_payment_status`].
    pub fn record_verdict(
        &mut self,
        caller: RegistryId,
        developer_won: bool,
        majority_auditors: Vec<ParticipantId>,
    ) -> Result<(), TaskDomainError> {
        let status = if developer_won {
            PaymentStatus::DeveloperWon
        } else {
            PaymentStatus::ProviderWon
        };
        self.set_payment_status(caller, status)?;
        self.majority_auditors = majority_auditors;
        Ok(())
    }

    /// Reserves the developer's or an auditor's allocation for `participant`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::Unauthorized`] for a foreign registry,
    /// [`TaskDomainError::DisbursementInFlight`] during another transfer,
    /// [`TaskDomainError::AlreadyWithdrawn`] on a second request and
    /// [`TaskDomainError::NoRewardEligible`] when the outcome owes the
    /// participant nothing.
    pub fn begin_withdrawal(
        &mut self,
        caller: RegistryId,
        participant: &ParticipantId,
    ) -> Result<Payout, TaskDomainError> {
        self.authorize(caller)?;
        self.ensure_idle()?;
        if self.has_withdrawn(participant) {
            return Err(TaskDomainError::AlreadyWithdrawn {
                escrow_id: self.id,
                participant: participant.clone(),
            });
        }
        let (amount, kind) = self.withdrawal_entitlement(participant)?;
        self.reserve(participant.clone(), amount, kind)
    }

    /// Reserves the provider's refund.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::Unauthorized`] for a foreign registry,
    /// [`TaskDomainError::DisbursementInFlight`] during another transfer,
    /// [`TaskDomainError::AlreadyRefunded`] on a second request and
    /// [`TaskDomainError::NoRewardEligible`] when nothing is refundable.
    pub fn begin_refund(&mut self, caller: RegistryId) -> Result<Payout, TaskDomainError> {
        self.authorize(caller)?;
        self.ensure_idle()?;
        if self.has_withdrawn(&self.provider) {
            return Err(TaskDomainError::AlreadyRefunded(self.id));
        }
        let amount = match self.payment_status {
            PaymentStatus::ProviderWon => self.held.checked_sub(self.auditor_pool())?,
            PaymentStatus::Cancelled => self.held,
            PaymentStatus::WorkAccepted => self.auditor_pool(),
            PaymentStatus::None | PaymentStatus::DeveloperWon => {
                return Err(self.not_eligible(&self.provider));
            }
        };
        self.reserve(self.provider.clone(), amount, PayoutKind::ProviderRefund)
    }

    /// Confirms the in-flight payout after its transfer succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::Unauthorized`] for a foreign registry and
    /// [`TaskDomainError::NoDisbursementInFlight`] when nothing is pending.
    pub fn complete_disbursement(&mut self, caller: RegistryId) -> Result<Payout, TaskDomainError> {
        self.authorize(caller)?;
        self.in_flight
            .take()
            .ok_or(TaskDomainError::NoDisbursementInFlight(self.id))
    }

    /// Undoes the in-flight payout after its transfer failed.
    ///
    /// The recipient becomes eligible again and the balance is restored.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::Unauthorized`] for a foreign registry and
    /// [`TaskDomainError::NoDisbursementInFlight`] when nothing is pending.
    pub fn revert_disbursement(&mut self, caller: RegistryId) -> Result<Payout, TaskDomainError> {
        self.authorize(caller)?;
        let payout = self
            .in_flight
            .take()
            .ok_or(TaskDomainError::NoDisbursementInFlight(self.id))?;
        self.disbursed = self.disbursed.checked_sub(payout.amount())?;
        self.withdrawn.remove(payout.recipient());
        Ok(payout)
    }

    fn withdrawal_entitlement(
        &self,
        participant: &ParticipantId,
    ) -> Result<(Amount, PayoutKind), TaskDomainError> {
        if *participant == self.developer {
            return match self.payment_status {
                PaymentStatus::WorkAccepted | PaymentStatus::DeveloperWon => {
                    Ok((self.developer_reward(), PayoutKind::DeveloperReward))
                }
                _ => Err(self.not_eligible(participant)),
            };
        }

        let settled_by_vote = matches!(
            self.payment_status,
            PaymentStatus::DeveloperWon | PaymentStatus::ProviderWon
        );
        let position = self
            .majority_auditors
            .iter()
            .position(|auditor| auditor == participant);
        match position {
            Some(position) if settled_by_vote => {
                let share = self
                    .split
                    .auditor_share(self.majority_auditors.len(), position)?;
                Ok((share, PayoutKind::AuditorShare))
            }
            _ => Err(self.not_eligible(participant)),
        }
    }

    fn reserve(
        &mut self,
        recipient: ParticipantId,
        amount: Amount,
        kind: PayoutKind,
    ) -> Result<Payout, TaskDomainError> {
        let disbursed = self.disbursed.checked_add(amount)?;
        if disbursed > self.held {
            return Err(TaskDomainError::InsufficientEscrowBalance {
                escrow_id: self.id,
                requested: amount,
                available: self.balance(),
            });
        }
        let payout = Payout {
            escrow_id: self.id,
            task_id: self.task_id,
            recipient: recipient.clone(),
            amount,
            kind,
        };
        self.withdrawn.insert(recipient);
        self.disbursed = disbursed;
        self.in_flight = Some(payout.clone());
        Ok(payout)
    }

    fn authorize(&self, caller: RegistryId) -> Result<(), TaskDomainError> {
        if caller == self.owner {
            Ok(())
        } else {
            Err(TaskDomainError::Unauthorized(self.id))
        }
    }

    const fn ensure_idle(&self) -> Result<(), TaskDomainError> {
        if self.in_flight.is_some() {
            return Err(TaskDomainError::DisbursementInFlight(self.id));
        }
        Ok(())
    }

    const fn ensure_unsettled(&self) -> Result<(), TaskDomainError> {
        if matches!(self.payment_status, PaymentStatus::None) {
            return Ok(());
        }
        Err(TaskDomainError::PaymentAlreadySettled {
            escrow_id: self.id,
            status: self.payment_status,
        })
    }

    fn not_eligible(&self, participant: &ParticipantId) -> TaskDomainError {
        TaskDomainError::NoRewardEligible {
            escrow_id: self.id,
            participant: participant.clone(),
        }
    }
}
