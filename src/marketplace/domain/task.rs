//! Task aggregate root.
//!
//! A task exclusively owns its candidate lists, its ballots and, once
//! started, its escrow. Every operation validates in the same order: the
//! caller's role, then the caller's relationship to the task, then the
//! task's status, then operation-specific preconditions, and finally
//! payment. A failed check leaves the aggregate untouched.

use super::{
    AUDITOR_PANEL_SIZE, Actor, Amount, AuditVotes, Ballot, Escrow, EscrowTerms, ParticipantId,
    PaymentStatus, Payout, RegistryId, RewardSplit, Role, TaskDomainError, TaskId, TaskStatus,
    VoteStatus,
};
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Provider-supplied details of a new task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    /// Short task title.
    pub title: String,
    /// Free-form description of the work.
    pub description: String,
    /// Latest time at which work may be submitted.
    pub deadline: DateTime<Utc>,
    /// Announced reward in smallest currency units.
    pub reward: Amount,
}

impl NewTask {
    /// Checks the request on behalf of `actor` and returns the split it
    /// would freeze.
    ///
    /// # Errors
    ///
    /// Fails like [`Task::create`].
    pub fn validate(
        &self,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<RewardSplit, TaskDomainError> {
        actor.require(Role::Provider)?;
        let split = RewardSplit::from_reward(self.reward)?;
        if self.deadline <= now {
            return Err(TaskDomainError::InvalidDeadline);
        }
        Ok(split)
    }
}

/// Task aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    provider: ParticipantId,
    developer: Option<ParticipantId>,
    title: String,
    description: String,
    split: RewardSplit,
    deadline: DateTime<Utc>,
    voting_deadline: Option<DateTime<Utc>>,
    status: TaskStatus,
    developer_candidates: Vec<ParticipantId>,
    auditor_candidates: Vec<ParticipantId>,
    auditor_panel: Vec<ParticipantId>,
    votes: AuditVotes,
    escrow: Option<Escrow>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a task in [`TaskStatus::Created`] and freezes its split.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::WrongRole`] unless the caller is a provider,
    /// [`TaskDomainError::InvalidReward`] for a zero reward and
    /// [`TaskDomainError::InvalidDeadline`] for a deadline that is not in the
    /// future.
    pub fn create(
        id: TaskId,
        actor: &Actor,
        request: NewTask,
        clock: &impl Clock,
    ) -> Result<Self, TaskDomainError> {
        let timestamp = clock.utc();
        let split = request.validate(actor, timestamp)?;

        Ok(Self {
            id,
            provider: actor.participant().clone(),
            developer: None,
            title: request.title,
            description: request.description,
            split,
            deadline: request.deadline,
            voting_deadline: None,
            status: TaskStatus::Created,
            developer_candidates: Vec::new(),
            auditor_candidates: Vec::new(),
            auditor_panel: Vec::new(),
            votes: AuditVotes::default(),
            escrow: None,
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the provider that posted the task.
    #[must_use]
    pub const fn provider(&self) -> &ParticipantId {
        &self.provider
    }

    /// Returns the assigned developer, if any.
    #[must_use]
    pub const fn developer(&self) -> Option<&ParticipantId> {
        self.developer.as_ref()
    }

    /// Returns the task title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the task description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the frozen reward split.
    #[must_use]
    pub const fn split(&self) -> &RewardSplit {
        &self.split
    }

    /// Returns the announced reward.
    #[must_use]
    pub const fn reward(&self) -> Amount {
        self.split.reward()
    }

    /// Returns the submission deadline.
    #[must_use]
    pub const fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    /// Returns the end of the voting window once a dispute is open.
    #[must_use]
    pub const fn voting_deadline(&self) -> Option<DateTime<Utc>> {
        self.voting_deadline
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns developer applicants in application order.
    #[must_use]
    pub fn developer_candidates(&self) -> &[ParticipantId] {
        &self.developer_candidates
    }

    /// Returns auditor applicants in application order.
    #[must_use]
    pub fn auditor_candidates(&self) -> &[ParticipantId] {
        &self.auditor_candidates
    }

    /// Returns the auditors frozen onto the dispute panel at start.
    #[must_use]
    pub fn auditor_panel(&self) -> &[ParticipantId] {
        &self.auditor_panel
    }

    /// Returns the ballots cast so far.
    #[must_use]
    pub const fn votes(&self) -> &AuditVotes {
        &self.votes
    }

    /// Returns the current vote tally.
    #[must_use]
    pub fn vote_status(&self) -> VoteStatus {
        self.votes.status()
    }

    /// Returns the escrow once the task has started.
    #[must_use]
    pub const fn escrow(&self) -> Option<&Escrow> {
        self.escrow.as_ref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest lifecycle timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns `true` when `participant` sits on the dispute panel.
    #[must_use]
    pub fn is_panel_auditor(&self, participant: &ParticipantId) -> bool {
        self.auditor_panel.contains(participant)
    }

    /// Records a developer application.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::WrongRole`],
    /// [`TaskDomainError::InvalidState`] outside [`TaskStatus::Created`],
    /// [`TaskDomainError::AlreadyApplied`] or
    /// [`TaskDomainError::CandidateLimitReached`].
    pub fn apply_as_developer(
        &mut self,
        actor: &Actor,
        limit: usize,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        self.apply(actor, Role::Developer, limit, clock)
    }

    /// Records an auditor application.
    ///
    /// # Errors
    ///
    /// Fails like [`Task::apply_as_developer`].
    pub fn apply_as_auditor(
        &mut self,
        actor: &Actor,
        limit: usize,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        self.apply(actor, Role::Auditor, limit, clock)
    }

    /// Chooses the developer from the candidate list.
    ///
    /// Reassignment is allowed until the task starts.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::WrongRole`],
    /// [`TaskDomainError::NotTaskProvider`], [`TaskDomainError::InvalidState`],
    /// [`TaskDomainError::NoCandidates`] or [`TaskDomainError::NotACandidate`].
    pub fn assign_developer(
        &mut self,
        actor: &Actor,
        developer: &ParticipantId,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        self.ensure_provider(actor)?;
        self.ensure_status(TaskStatus::Created, "assign a developer")?;
        if self.developer_candidates.is_empty() {
            return Err(TaskDomainError::NoCandidates(self.id));
        }
        if !self.developer_candidates.contains(developer) {
            return Err(TaskDomainError::NotACandidate {
                task_id: self.id,
                developer: developer.clone(),
            });
        }
        self.developer = Some(developer.clone());
        self.touch(clock);
        Ok(())
    }

    /// Funds the task, freezes the auditor panel and opens the escrow.
    ///
    /// Returns the protocol fee the caller must forward to the treasury.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::WrongRole`],
    /// [`TaskDomainError::NotTaskProvider`], [`TaskDomainError::InvalidState`],
    /// [`TaskDomainError::DeveloperNotAssigned`],
    /// [`TaskDomainError::InsufficientAuditors`] or
    /// [`TaskDomainError::PaymentMismatch`].
    pub fn start(
        &mut self,
        actor: &Actor,
        payment: Amount,
        owner: RegistryId,
        clock: &impl Clock,
    ) -> Result<Amount, TaskDomainError> {
        self.ensure_provider(actor)?;
        self.ensure_status(TaskStatus::Created, "start")?;
        let developer = self
            .developer
            .clone()
            .ok_or(TaskDomainError::DeveloperNotAssigned(self.id))?;
        if self.auditor_candidates.len() < AUDITOR_PANEL_SIZE {
            return Err(TaskDomainError::InsufficientAuditors {
                task_id: self.id,
                required: AUDITOR_PANEL_SIZE,
                actual: self.auditor_candidates.len(),
            });
        }
        if payment != self.reward() {
            return Err(TaskDomainError::PaymentMismatch {
                expected: self.reward(),
                actual: payment,
            });
        }

        let escrow = Escrow::open(
            EscrowTerms {
                owner,
                task_id: self.id,
                provider: self.provider.clone(),
                developer,
                split: self.split,
                deposit: self.split.escrowed()?,
            },
            clock.utc(),
        )?;
        self.transition_to(TaskStatus::InProgress, clock)?;
        self.auditor_panel = self
            .auditor_candidates
            .iter()
            .take(AUDITOR_PANEL_SIZE)
            .cloned()
            .collect();
        self.escrow = Some(escrow);
        Ok(self.split.protocol_fee())
    }

    /// Marks the work as delivered.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::WrongRole`],
    /// [`TaskDomainError::NotTaskDeveloper`], [`TaskDomainError::InvalidState`]
    /// or [`TaskDomainError::DeadlinePassed`].
    pub fn submit_work(&mut self, actor: &Actor, clock: &impl Clock) -> Result<(), TaskDomainError> {
        self.ensure_developer(actor)?;
        self.ensure_status(TaskStatus::InProgress, "submit work")?;
        if clock.utc() > self.deadline {
            return Err(TaskDomainError::DeadlinePassed(self.id));
        }
        self.transition_to(TaskStatus::Submitted, clock)
    }

    /// Accepts submitted work without dispute.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::WrongRole`],
    /// [`TaskDomainError::NotTaskProvider`] or
    /// [`TaskDomainError::InvalidState`] unless the work was submitted.
    pub fn accept_work(
        &mut self,
        actor: &Actor,
        owner: RegistryId,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        self.ensure_provider(actor)?;
        self.ensure_status(TaskStatus::Submitted, "accept work")?;
        self.settle_accepted(owner, clock)
    }

    /// Completes an in-progress task directly, with the same settlement as
    /// accepted work.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::WrongRole`],
    /// [`TaskDomainError::NotTaskProvider`] or
    /// [`TaskDomainError::InvalidState`] unless the task is in progress.
    pub fn complete(
        &mut self,
        actor: &Actor,
        owner: RegistryId,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        self.ensure_provider(actor)?;
        self.ensure_status(TaskStatus::InProgress, "complete")?;
        self.settle_accepted(owner, clock)
    }

    /// Opens a dispute over submitted work and starts the voting window.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::RoleRequired`],
    /// [`TaskDomainError::NotAuthorized`] unless the caller is the task's
    /// provider or developer, [`TaskDomainError::InvalidState`] unless the
    /// work was submitted and [`TaskDomainError::DeadlineOutOfRange`] when the
    /// voting deadline overflows.
    pub fn initiate_dispute(
        &mut self,
        actor: &Actor,
        owner: RegistryId,
        voting_period: TimeDelta,
        clock: &impl Clock,
    ) -> Result<DateTime<Utc>, TaskDomainError> {
        actor.require_any()?;
        let participant = actor.participant();
        if *participant != self.provider && self.developer.as_ref() != Some(participant) {
            return Err(TaskDomainError::NotAuthorized {
                task_id: self.id,
                participant: participant.clone(),
            });
        }
        self.ensure_status(TaskStatus::Submitted, "initiate a dispute")?;
        let voting_deadline = clock
            .utc()
            .checked_add_signed(voting_period)
            .ok_or(TaskDomainError::DeadlineOutOfRange)?;

        self.escrow_mut()?.mark_disputed(owner)?;
        self.transition_to(TaskStatus::Disputed, clock)?;
        self.voting_deadline = Some(voting_deadline);
        Ok(voting_deadline)
    }

    /// Records a panel auditor's ballot and resolves the dispute when the
    /// panel is complete.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::WrongRole`],
    /// [`TaskDomainError::NotTaskAuditor`], [`TaskDomainError::NotDisputed`],
    /// [`TaskDomainError::AlreadyVoted`] or
    /// [`TaskDomainError::VotingPeriodEnded`].
    pub fn cast_vote(
        &mut self,
        actor: &Actor,
        in_favour_of_developer: bool,
        owner: RegistryId,
        clock: &impl Clock,
    ) -> Result<VoteStatus, TaskDomainError> {
        actor.require(Role::Auditor)?;
        let auditor = actor.participant();
        if !self.is_panel_auditor(auditor) {
            return Err(TaskDomainError::NotTaskAuditor {
                task_id: self.id,
                participant: auditor.clone(),
            });
        }
        if self.status != TaskStatus::Disputed {
            return Err(TaskDomainError::NotDisputed(self.id));
        }
        if self.votes.ballot_of(auditor).is_some() {
            return Err(TaskDomainError::AlreadyVoted {
                task_id: self.id,
                auditor: auditor.clone(),
            });
        }
        let now = clock.utc();
        if self.voting_deadline.is_some_and(|deadline| now > deadline) {
            return Err(TaskDomainError::VotingPeriodEnded(self.id));
        }

        let mut votes = self.votes.clone();
        let status = votes.record(Ballot::new(auditor.clone(), in_favour_of_developer, now));
        if let Some(developer_won) = status.verdict() {
            let majority = votes
                .majority_in(&self.auditor_panel, developer_won)
                .into_iter()
                .cloned()
                .collect();
            let target = if developer_won {
                TaskStatus::CompletedWithDeveloperWon
            } else {
                TaskStatus::CompletedWithProviderWon
            };
            if !self.status.can_transition_to(target) {
                return Err(self.invalid_transition(target));
            }
            self.escrow_mut()?
                .record_verdict(owner, developer_won, majority)?;
            self.transition_to(target, clock)?;
        } else {
            self.touch(clock);
        }
        self.votes = votes;
        Ok(status)
    }

    /// Cancels a task whose deadline passed before submission.
    ///
    /// Returns the developer to flag when the task was already in progress;
    /// a task that never started is cancelled without a strike.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::RoleRequired`],
    /// [`TaskDomainError::InvalidState`] once the task left
    /// [`TaskStatus::Created`] or [`TaskStatus::InProgress`] and
    /// [`TaskDomainError::DeadlineNotReached`] before the deadline.
    pub fn penalize_missed_deadline(
        &mut self,
        actor: &Actor,
        owner: RegistryId,
        clock: &impl Clock,
    ) -> Result<Option<ParticipantId>, TaskDomainError> {
        actor.require_any()?;
        if !matches!(self.status, TaskStatus::Created | TaskStatus::InProgress) {
            return Err(self.invalid_state("penalize a missed deadline"));
        }
        if clock.utc() <= self.deadline {
            return Err(TaskDomainError::DeadlineNotReached(self.id));
        }

        if self.status == TaskStatus::Created {
            self.transition_to(TaskStatus::Cancelled, clock)?;
            return Ok(None);
        }
        if !self.status.can_transition_to(TaskStatus::Cancelled) {
            return Err(self.invalid_transition(TaskStatus::Cancelled));
        }
        self.escrow_mut()?
            .set_payment_status(owner, PaymentStatus::Cancelled)?;
        self.transition_to(TaskStatus::Cancelled, clock)?;
        Ok(self.developer.clone())
    }

    /// Moves the submission deadline of a task that has not started.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::WrongRole`],
    /// [`TaskDomainError::NotTaskProvider`], [`TaskDomainError::InvalidState`]
    /// or [`TaskDomainError::InvalidDeadline`].
    pub fn update_deadline(
        &mut self,
        actor: &Actor,
        deadline: DateTime<Utc>,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        self.ensure_provider(actor)?;
        self.ensure_status(TaskStatus::Created, "update the deadline")?;
        if deadline <= clock.utc() {
            return Err(TaskDomainError::InvalidDeadline);
        }
        self.deadline = deadline;
        self.touch(clock);
        Ok(())
    }

    /// Reserves the caller's developer reward or auditor share.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::RoleRequired`],
    /// [`TaskDomainError::InvalidWithdrawalRole`] for providers,
    /// [`TaskDomainError::NotTaskDeveloper`] or
    /// [`TaskDomainError::NotTaskAuditor`] for unrelated callers,
    /// [`TaskDomainError::EscrowMissing`] before start, and any escrow
    /// eligibility error.
    pub fn begin_withdrawal(
        &mut self,
        actor: &Actor,
        owner: RegistryId,
    ) -> Result<Payout, TaskDomainError> {
        let participant = actor.participant();
        match actor.require_any()? {
            Role::Provider => {
                return Err(TaskDomainError::InvalidWithdrawalRole {
                    task_id: self.id,
                    role: Role::Provider,
                });
            }
            Role::Developer => {
                if self.developer.as_ref() != Some(participant) {
                    return Err(TaskDomainError::NotTaskDeveloper {
                        task_id: self.id,
                        participant: participant.clone(),
                    });
                }
            }
            Role::Auditor => {
                if !self.is_panel_auditor(participant) {
                    return Err(TaskDomainError::NotTaskAuditor {
                        task_id: self.id,
                        participant: participant.clone(),
                    });
                }
            }
        }
        self.escrow_mut()?.begin_withdrawal(owner, participant)
    }

    /// Reserves the provider's refund.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::WrongRole`],
    /// [`TaskDomainError::NotTaskProvider`],
    /// [`TaskDomainError::EscrowMissing`] before start, and any escrow
    /// eligibility error.
    pub fn begin_refund(
        &mut self,
        actor: &Actor,
        owner: RegistryId,
    ) -> Result<Payout, TaskDomainError> {
        self.ensure_provider(actor)?;
        self.escrow_mut()?.begin_refund(owner)
    }

    /// Confirms the escrow's in-flight payout.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EscrowMissing`] or the escrow's error.
    pub fn complete_disbursement(&mut self, owner: RegistryId) -> Result<Payout, TaskDomainError> {
        self.escrow_mut()?.complete_disbursement(owner)
    }

    /// Rolls back the escrow's in-flight payout.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EscrowMissing`] or the escrow's error.
    pub fn revert_disbursement(&mut self, owner: RegistryId) -> Result<Payout, TaskDomainError> {
        self.escrow_mut()?.revert_disbursement(owner)
    }

    fn apply(
        &mut self,
        actor: &Actor,
        role: Role,
        limit: usize,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        actor.require(role)?;
        self.ensure_status(TaskStatus::Created, "accept applications")?;
        let task_id = self.id;
        let candidates = match role {
            Role::Auditor => &mut self.auditor_candidates,
            Role::Developer | Role::Provider => &mut self.developer_candidates,
        };
        let participant = actor.participant();
        if candidates.contains(participant) {
            return Err(TaskDomainError::AlreadyApplied {
                task_id,
                participant: participant.clone(),
            });
        }
        if candidates.len() >= limit {
            return Err(TaskDomainError::CandidateLimitReached {
                task_id,
                role,
                limit,
            });
        }
        candidates.push(participant.clone());
        self.touch(clock);
        Ok(())
    }

    fn settle_accepted(&mut self, owner: RegistryId, clock: &impl Clock) -> Result<(), TaskDomainError> {
        if !self.status.can_transition_to(TaskStatus::Completed) {
            return Err(self.invalid_transition(TaskStatus::Completed));
        }
        self.escrow_mut()?
            .set_payment_status(owner, PaymentStatus::WorkAccepted)?;
        self.transition_to(TaskStatus::Completed, clock)
    }

    fn ensure_provider(&self, actor: &Actor) -> Result<(), TaskDomainError> {
        actor.require(Role::Provider)?;
        if *actor.participant() != self.provider {
            return Err(TaskDomainError::NotTaskProvider {
                task_id: self.id,
                participant: actor.participant().clone(),
            });
        }
        Ok(())
    }

    fn ensure_developer(&self, actor: &Actor) -> Result<(), TaskDomainError> {
        actor.require(Role::Developer)?;
        if self.developer.as_ref() != Some(actor.participant()) {
            return Err(TaskDomainError::NotTaskDeveloper {
                task_id: self.id,
                participant: actor.participant().clone(),
            });
        }
        Ok(())
    }

    fn ensure_status(
        &self,
        expected: TaskStatus,
        operation: &'static str,
    ) -> Result<(), TaskDomainError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(self.invalid_state(operation))
        }
    }

    const fn invalid_state(&self, operation: &'static str) -> TaskDomainError {
        TaskDomainError::InvalidState {
            task_id: self.id,
            status: self.status,
            operation,
        }
    }

    const fn invalid_transition(&self, target: TaskStatus) -> TaskDomainError {
        TaskDomainError::InvalidStateTransition {
            task_id: self.id,
            from: self.status,
            to: target,
        }
    }

    fn escrow_mut(&mut self) -> Result<&mut Escrow, TaskDomainError> {
        self.escrow
            .as_mut()
            .ok_or(TaskDomainError::EscrowMissing(self.id))
    }

    fn transition_to(
        &mut self,
        target: TaskStatus,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        if !self.status.can_transition_to(target) {
            return Err(self.invalid_transition(target));
        }
        self.status = target;
        self.touch(clock);
        Ok(())
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}
