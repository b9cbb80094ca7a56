//! Task registry service: lifecycle orchestration over the task aggregate.
//!
//! Every mutating operation resolves the caller's role, then loads, mutates
//! and persists the task while holding the registry's ledger lock. Outward
//! calls (treasury, reputation, events, payments) happen after the write is
//! committed and the lock is released. Disbursements additionally queue on a
//! per-task gate that stays held until the transfer outcome is recorded.

mod dispute;
mod queries;
mod settlement;

pub use settlement::TransferOutcome;

use crate::config::{ConfigError, MarketplaceConfig};
use crate::marketplace::{
    domain::{
        Actor, Amount, ErrorKind, MarketEvent, NewTask, ParticipantId, RegistryId, Task,
        TaskDomainError, TaskId,
    },
    ports::{
        AchievementLedger, EventPublisher, PaymentError, PaymentGateway, RedflagLedger, RoleGate,
        RoleGateError, TaskRepository, TaskRepositoryError, Treasury,
    },
};
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Service-level errors for task registry operations.
#[derive(Debug, Error)]
pub enum TaskRegistryError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] TaskRepositoryError),
    /// Role lookup failed.
    #[error(transparent)]
    RoleGate(#[from] RoleGateError),
    /// The outward transfer failed and the disbursement was rolled back.
    #[error(transparent)]
    Payment(#[from] PaymentError),
    /// The registry configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// No task exists with the given identifier.
    #[error("task {0} not found")]
    TaskNotFound(TaskId),
}

impl TaskRegistryError {
    /// Returns the domain error taxonomy bucket, if this is a domain error.
    #[must_use]
    pub const fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Domain(err) => Some(err.kind()),
            _ => None,
        }
    }

    /// Returns the wrapped domain error, if any.
    #[must_use]
    pub const fn as_domain(&self) -> Option<&TaskDomainError> {
        match self {
            Self::Domain(err) => Some(err),
            _ => None,
        }
    }
}

/// Result type for task registry operations.
pub type TaskRegistryResult<T> = Result<T, TaskRegistryError>;

/// Collaborators notified after committed operations.
#[derive(Clone)]
pub struct Collaborators {
    /// Receives the protocol fee at task start.
    pub treasury: Arc<dyn Treasury>,
    /// Receives completed-task notifications.
    pub achievements: Arc<dyn AchievementLedger>,
    /// Receives strike notifications.
    pub redflags: Arc<dyn RedflagLedger>,
    /// Performs outward fund transfers.
    pub payments: Arc<dyn PaymentGateway>,
    /// Receives domain events.
    pub events: Arc<dyn EventPublisher>,
}

/// Task registry orchestration service.
///
/// The registry owns every task it creates and is the only party its
/// escrows take instructions from. A registry restarted over a durable
/// repository must be rebuilt with [`TaskRegistryService::with_registry_id`]
/// to keep control of the escrows it opened earlier.
#[derive(Clone)]
pub struct TaskRegistryService<R, G, C>
where
    R: TaskRepository,
    G: RoleGate,
    C: Clock + Send + Sync,
{
    registry_id: RegistryId,
    repository: Arc<R>,
    role_gate: Arc<G>,
    collaborators: Collaborators,
    clock: Arc<C>,
    config: MarketplaceConfig,
    voting_period: TimeDelta,
    ledger: Arc<Mutex<()>>,
    disbursement_gates: Arc<Mutex<HashMap<TaskId, Arc<Mutex<()>>>>>,
}

impl<R, G, C> TaskRegistryService<R, G, C>
where
    R: TaskRepository,
    G: RoleGate,
    C: Clock + Send + Sync,
{
    /// Creates a registry with a fresh identity.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRegistryError::Config`] when `config` fails validation.
    pub fn new(
        repository: Arc<R>,
        role_gate: Arc<G>,
        collaborators: Collaborators,
        clock: Arc<C>,
        config: MarketplaceConfig,
    ) -> TaskRegistryResult<Self> {
        config.validate()?;
        let voting_period = config.voting_period()?;
        Ok(Self {
            registry_id: RegistryId::new(),
            repository,
            role_gate,
            collaborators,
            clock,
            config,
            voting_period,
            ledger: Arc::new(Mutex::new(())),
            disbursement_gates: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Rebinds the registry to an existing identity.
    ///
    /// Escrows only accept instructions from the registry that opened them,
    /// so a deployment that persists tasks must reuse the same identity
    /// across restarts and replicas.
    #[must_use]
    pub const fn with_registry_id(mut self, registry_id: RegistryId) -> Self {
        self.registry_id = registry_id;
        self
    }

    /// Returns the identity escrows created by this registry answer to.
    #[must_use]
    pub const fn registry_id(&self) -> RegistryId {
        self.registry_id
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &MarketplaceConfig {
        &self.config
    }

    /// Posts a new task on behalf of `provider`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRegistryError::Domain`] when the caller is not a
    /// provider, the reward is zero or the deadline is not in the future, and
    /// repository or role-gate errors otherwise.
    pub async fn create_task(
        &self,
        provider: &ParticipantId,
        request: NewTask,
    ) -> TaskRegistryResult<Task> {
        let actor = self.actor(provider).await?;
        let task = {
            let _ledger = self.ledger.lock().await;
            request.validate(&actor, self.clock.utc())?;
            let task_id = self.repository.next_task_id().await?;
            let task = Task::create(task_id, &actor, request, &*self.clock)?;
            self.repository.store(&task).await?;
            task
        };

        info!(task_id = %task.id(), provider = %provider, reward = %task.reward(), "task created");
        self.publish(MarketEvent::TaskCreated {
            task_id: task.id(),
            provider: provider.clone(),
            reward: task.reward(),
            deadline: task.deadline(),
        })
        .await;
        Ok(task)
    }

    /// Records `developer`'s application for a task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRegistryError::TaskNotFound`] for unknown tasks and
    /// [`TaskRegistryError::Domain`] for role, state, duplicate or capacity
    /// violations.
    pub async fn apply_for_task_as_developer(
        &self,
        task_id: TaskId,
        developer: &ParticipantId,
    ) -> TaskRegistryResult<Task> {
        let actor = self.actor(developer).await?;
        let limit = self.config.max_candidates;
        let (task, ()) = self
            .mutate(task_id, |task| {
                task.apply_as_developer(&actor, limit, &*self.clock)
            })
            .await?;

        info!(task_id = %task_id, developer = %developer, "developer applied");
        self.publish(MarketEvent::DeveloperApplied {
            task_id,
            developer: developer.clone(),
        })
        .await;
        Ok(task)
    }

    /// Records `auditor`'s application for a task.
    ///
    /// # Errors
    ///
    /// Fails like [`Self::apply_for_task_as_developer`].
    pub async fn apply_for_task_as_auditor(
        &self,
        task_id: TaskId,
        auditor: &ParticipantId,
    ) -> TaskRegistryResult<Task> {
        let actor = self.actor(auditor).await?;
        let limit = self.config.max_candidates;
        let (task, ()) = self
            .mutate(task_id, |task| task.apply_as_auditor(&actor, limit, &*self.clock))
            .await?;

        info!(task_id = %task_id, auditor = %auditor, "auditor applied");
        self.publish(MarketEvent::AuditorApplied {
            task_id,
            auditor: auditor.clone(),
        })
        .await;
        Ok(task)
    }

    /// Assigns `developer` to the task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRegistryError::Domain`] when the caller is not the
    /// task's provider, the task is not open or the developer never applied.
    pub async fn assign_developer(
        &self,
        task_id: TaskId,
        provider: &ParticipantId,
        developer: &ParticipantId,
    ) -> TaskRegistryResult<Task> {
        let actor = self.actor(provider).await?;
        let (task, ()) = self
            .mutate(task_id, |task| {
                task.assign_developer(&actor, developer, &*self.clock)
            })
            .await?;

        info!(task_id = %task_id, developer = %developer, "developer assigned");
        self.publish(MarketEvent::DeveloperAssigned {
            task_id,
            developer: developer.clone(),
        })
        .await;
        Ok(task)
    }

    /// Funds and starts the task.
    ///
    /// `payment` must equal the announced reward. The protocol fee is sent to
    /// the treasury once the start is committed; a treasury failure is logged
    /// and does not undo the start.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRegistryError::Domain`] for role, ownership, state,
    /// staffing or payment violations.
    pub async fn start_task(
        &self,
        task_id: TaskId,
        provider: &ParticipantId,
        payment: Amount,
    ) -> TaskRegistryResult<Task> {
        let actor = self.actor(provider).await?;
        let owner = self.registry_id;
        let (task, fee) = self
            .mutate(task_id, |task| task.start(&actor, payment, owner, &*self.clock))
            .await?;

        if let Err(err) = self.collaborators.treasury.receive_fee(task_id, fee).await {
            warn!(task_id = %task_id, fee = %fee, error = %err, "treasury rejected protocol fee");
        }
        if let Some(escrow) = task.escrow() {
            info!(
                task_id = %task_id,
                escrow_id = %escrow.id(),
                escrowed = %escrow.held(),
                "task started"
            );
            self.publish(MarketEvent::TaskStarted {
                task_id,
                escrow_id: escrow.id(),
                escrowed: escrow.held(),
                auditor_panel: task.auditor_panel().to_vec(),
            })
            .await;
        }
        Ok(task)
    }

    /// Marks the work as delivered.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRegistryError::Domain`] when the caller is not the
    /// assigned developer, the task is not in progress or the deadline passed.
    pub async fn submit_work(
        &self,
        task_id: TaskId,
        developer: &ParticipantId,
    ) -> TaskRegistryResult<Task> {
        let actor = self.actor(developer).await?;
        let (task, ()) = self
            .mutate(task_id, |task| task.submit_work(&actor, &*self.clock))
            .await?;

        self.publish(MarketEvent::WorkSubmitted {
            task_id,
            developer: developer.clone(),
        })
        .await;
        Ok(task)
    }

    /// Accepts submitted work without dispute.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRegistryError::Domain`] when the caller is not the
    /// task's provider or the work has not been submitted.
    pub async fn accept_work(
        &self,
        task_id: TaskId,
        provider: &ParticipantId,
    ) -> TaskRegistryResult<Task> {
        let actor = self.actor(provider).await?;
        let owner = self.registry_id;
        let (task, ()) = self
            .mutate(task_id, |task| task.accept_work(&actor, owner, &*self.clock))
            .await?;
        self.after_acceptance(&task).await;
        Ok(task)
    }

    /// Completes an in-progress task directly.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRegistryError::Domain`] when the caller is not the
    /// task's provider or the task is not in progress.
    pub async fn complete_task(
        &self,
        task_id: TaskId,
        provider: &ParticipantId,
    ) -> TaskRegistryResult<Task> {
        let actor = self.actor(provider).await?;
        let owner = self.registry_id;
        let (task, ()) = self
            .mutate(task_id, |task| task.complete(&actor, owner, &*self.clock))
            .await?;
        self.after_acceptance(&task).await;
        Ok(task)
    }

    /// Cancels a task whose deadline passed before submission.
    ///
    /// Any participant holding a role may trigger the check. When the task
    /// was in progress the developer is flagged.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRegistryError::Domain`] when the caller holds no role,
    /// the task already left the open states or the deadline has not passed.
    pub async fn check_deadline_and_penalize(
        &self,
        task_id: TaskId,
        caller: &ParticipantId,
    ) -> TaskRegistryResult<Task> {
        let actor = self.actor(caller).await?;
        let owner = self.registry_id;
        let (task, penalized) = self
            .mutate(task_id, |task| {
                task.penalize_missed_deadline(&actor, owner, &*self.clock)
            })
            .await?;

        if let Some(developer) = penalized {
            warn!(task_id = %task_id, developer = %developer, "developer missed deadline");
            self.flag(&developer).await;
            self.publish(MarketEvent::DeveloperPenalized { task_id, developer })
                .await;
        }
        Ok(task)
    }

    /// Moves the deadline of a task that has not started.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRegistryError::Domain`] when the caller is not the
    /// task's provider, the task has started or the deadline is not in the
    /// future.
    pub async fn update_task_deadline(
        &self,
        task_id: TaskId,
        provider: &ParticipantId,
        deadline: DateTime<Utc>,
    ) -> TaskRegistryResult<Task> {
        let actor = self.actor(provider).await?;
        let (task, ()) = self
            .mutate(task_id, |task| {
                task.update_deadline(&actor, deadline, &*self.clock)
            })
            .await?;

        info!(task_id = %task_id, deadline = %deadline, "task deadline updated");
        self.publish(MarketEvent::TaskDeadlineUpdated { task_id, deadline })
            .await;
        Ok(task)
    }

    async fn actor(&self, participant: &ParticipantId) -> TaskRegistryResult<Actor> {
        let role = self.role_gate.role_of(participant).await?;
        Ok(Actor::new(participant.clone(), role))
    }

    async fn load(&self, task_id: TaskId) -> TaskRegistryResult<Task> {
        self.repository
            .find_by_id(task_id)
            .await?
            .ok_or(TaskRegistryError::TaskNotFound(task_id))
    }

    /// Applies `operation` to a fresh copy of the task and persists the
    /// result, all under the ledger lock.
    ///
    /// Nothing is written when `operation` fails.
    async fn mutate<T, F>(&self, task_id: TaskId, operation: F) -> TaskRegistryResult<(Task, T)>
    where
        F: FnOnce(&mut Task) -> Result<T, TaskDomainError> + Send,
        T: Send,
    {
        let (task, previous_status, value) = {
            let _ledger = self.ledger.lock().await;
            let mut task = self.load(task_id).await?;
            let previous_status = task.status();
            let value = operation(&mut task)?;
            self.repository.update(&task).await?;
            (task, previous_status, value)
        };

        if previous_status != task.status() {
            info!(
                task_id = %task_id,
                from = %previous_status,
                to = %task.status(),
                "task status updated"
            );
            self.publish(MarketEvent::TaskStatusUpdated {
                task_id,
                from: previous_status,
                to: task.status(),
            })
            .await;
        }
        Ok((task, value))
    }

    async fn after_acceptance(&self, task: &Task) {
        self.publish(MarketEvent::WorkAccepted { task_id: task.id() })
            .await;
        if let Some(developer) = task.developer() {
            self.credit(developer).await;
        }
    }

    async fn credit(&self, developer: &ParticipantId) {
        if let Err(err) = self
            .collaborators
            .achievements
            .record_task_completed(developer)
            .await
        {
            warn!(developer = %developer, error = %err, "achievement notification failed");
        }
    }

    async fn flag(&self, developer: &ParticipantId) {
        if let Err(err) = self
            .collaborators
            .redflags
            .record_lost_dispute(developer)
            .await
        {
            warn!(developer = %developer, error = %err, "redflag notification failed");
        }
    }

    async fn publish(&self, event: MarketEvent) {
        if let Err(err) = self.collaborators.events.publish(&event).await {
            warn!(task_id = %event.task_id(), error = %err, "event publication failed");
        }
    }
}
