//! Shared harness for in-memory marketplace integration tests.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use rstest::fixture;
use taskmarket::{
    config::MarketplaceConfig,
    marketplace::{
        adapters::memory::{
            InMemoryEventLog, InMemoryPaymentLedger, InMemoryReputationLedger,
            InMemoryRoleRegistry, InMemoryTaskRepository, InMemoryTreasury, ManualClock,
        },
        domain::{Amount, NewTask, ParticipantId, Role, TaskId},
        services::{Collaborators, TaskRegistryError, TaskRegistryService},
    },
};

/// Registry wired to in-memory adapters.
pub type TestRegistry =
    TaskRegistryService<InMemoryTaskRepository, InMemoryRoleRegistry, ManualClock>;

/// Fixed starting instant for every test clock.
#[must_use]
pub fn epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(1_767_225_600, 0).expect("epoch is representable")
}

/// Returns a validated participant identifier.
#[must_use]
pub fn participant(name: &str) -> ParticipantId {
    ParticipantId::new(name).expect("test participant ids are valid")
}

/// Returns `percent` hundredths of one currency unit.
#[must_use]
pub fn percent_of_unit(percent: u128) -> Amount {
    Amount::UNIT
        .percent(percent)
        .expect("percent of one unit fits")
}

/// A registry together with the in-memory collaborators it reports to.
pub struct Marketplace {
    pub registry: Arc<TestRegistry>,
    pub roles: Arc<InMemoryRoleRegistry>,
    pub repository: Arc<InMemoryTaskRepository>,
    pub treasury: Arc<InMemoryTreasury>,
    pub reputation: Arc<InMemoryReputationLedger>,
    pub payments: Arc<InMemoryPaymentLedger>,
    pub events: Arc<InMemoryEventLog>,
    pub clock: ManualClock,
}

impl Marketplace {
    /// Builds a marketplace with `config`.
    #[must_use]
    pub fn with_config(config: MarketplaceConfig) -> Self {
        Self::with_collaborators(config, |_| {})
    }

    /// Builds a marketplace, letting the caller replace collaborators before
    /// the registry is created.
    #[must_use]
    pub fn with_collaborators(
        config: MarketplaceConfig,
        adjust: impl FnOnce(&mut Collaborators),
    ) -> Self {
        let roles = Arc::new(InMemoryRoleRegistry::new());
        let repository = Arc::new(InMemoryTaskRepository::new());
        let treasury = Arc::new(InMemoryTreasury::new());
        let reputation = Arc::new(InMemoryReputationLedger::new());
        let payments = Arc::new(InMemoryPaymentLedger::new());
        let events = Arc::new(InMemoryEventLog::new());
        let clock = ManualClock::new(epoch());

        let mut collaborators = Collaborators {
            treasury: treasury.clone(),
            achievements: reputation.clone(),
            redflags: reputation.clone(),
            payments: payments.clone(),
            events: events.clone(),
        };
        adjust(&mut collaborators);

        let registry = TaskRegistryService::new(
            Arc::clone(&repository),
            Arc::clone(&roles),
            collaborators,
            Arc::new(clock.clone()),
            config,
        )
        .expect("test configuration is valid");

        Self {
            registry: Arc::new(registry),
            roles,
            repository,
            treasury,
            reputation,
            payments,
            events,
            clock,
        }
    }

    /// Builds another registry over the same repository and collaborators,
    /// as a restarted process would.
    #[must_use]
    pub fn restarted_registry(&self) -> TestRegistry {
        TaskRegistryService::new(
            Arc::clone(&self.repository),
            Arc::clone(&self.roles),
            Collaborators {
                treasury: self.treasury.clone(),
                achievements: self.reputation.clone(),
                redflags: self.reputation.clone(),
                payments: self.payments.clone(),
                events: self.events.clone(),
            },
            Arc::new(self.clock.clone()),
            *self.registry.config(),
        )
        .expect("test configuration is valid")
    }

    /// Registers `name` under `role` and returns its identifier.
    #[must_use]
    pub fn enrol(&self, name: &str, role: Role) -> ParticipantId {
        let id = participant(name);
        self.roles
            .request_role(&id, role)
            .expect("test participant holds one role");
        id
    }

    /// Posts a one-unit task due three days after the epoch.
    pub async fn post(&self, provider: &ParticipantId) -> Result<TaskId, TaskRegistryError> {
        let task = self
            .registry
            .create_task(
                provider,
                NewTask {
                    title: "Port the indexer".to_owned(),
                    description: "Move the indexer onto the new event schema".to_owned(),
                    deadline: epoch() + TimeDelta::days(3),
                    reward: Amount::UNIT,
                },
            )
            .await?;
        Ok(task.id())
    }
}

/// Provides a marketplace with default configuration.
#[fixture]
pub fn marketplace() -> Marketplace {
    Marketplace::with_config(MarketplaceConfig::default())
}

/// Participants of one fully staffed task.
pub struct Staff {
    pub provider: ParticipantId,
    pub developer: ParticipantId,
    pub auditors: [ParticipantId; 3],
}

impl Staff {
    /// Enrols a provider, a developer and three auditors.
    #[must_use]
    pub fn enrol(marketplace: &Marketplace) -> Self {
        Self {
            provider: marketplace.enrol("acme", Role::Provider),
            developer: marketplace.enrol("dev-ada", Role::Developer),
            auditors: [
                marketplace.enrol("aud-bo", Role::Auditor),
                marketplace.enrol("aud-cy", Role::Auditor),
                marketplace.enrol("aud-di", Role::Auditor),
            ],
        }
    }

    /// Posts, staffs and funds a task.
    pub async fn start(&self, marketplace: &Marketplace) -> Result<TaskId, TaskRegistryError> {
        let registry = &marketplace.registry;
        let task_id = marketplace.post(&self.provider).await?;
        registry
            .apply_for_task_as_developer(task_id, &self.developer)
            .await?;
        for auditor in &self.auditors {
            registry.apply_for_task_as_auditor(task_id, auditor).await?;
        }
        registry
            .assign_developer(task_id, &self.provider, &self.developer)
            .await?;
        registry
            .start_task(task_id, &self.provider, Amount::UNIT)
            .await?;
        Ok(task_id)
    }
}
