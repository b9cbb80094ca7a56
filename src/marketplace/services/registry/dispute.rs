//! Dispute opening and auditor voting.

use super::{TaskRegistryResult, TaskRegistryService};
use crate::marketplace::{
    domain::{MarketEvent, ParticipantId, Task, TaskId, TaskStatus, VoteStatus},
    ports::{RoleGate, TaskRepository},
};
use mockable::Clock;
use tracing::{debug, info};

impl<R, G, C> TaskRegistryService<R, G, C>
where
    R: TaskRepository,
    G: RoleGate,
    C: Clock + Send + Sync,
{
    /// Opens a dispute over submitted work.
    ///
    /// Only the task's provider or developer may dispute. The voting window
    /// starts now and lasts for the configured voting period.
    ///
    /// # Errors
    ///
    /// Returns [`super::TaskRegistryError::Domain`] when the caller is not a
    /// party to the task or the work has not been submitted.
    pub async fn initiate_dispute(
        &self,
        task_id: TaskId,
        initiator: &ParticipantId,
    ) -> TaskRegistryResult<Task> {
        let actor = self.actor(initiator).await?;
        let owner = self.registry_id;
        let voting_period = self.voting_period;
        let (task, voting_deadline) = self
            .mutate(task_id, |task| {
                task.initiate_dispute(&actor, owner, voting_period, &*self.clock)
            })
            .await?;

        info!(
            task_id = %task_id,
            initiator = %initiator,
            voting_deadline = %voting_deadline,
            "dispute initiated"
        );
        self.publish(MarketEvent::DisputeInitiated {
            task_id,
            initiator: initiator.clone(),
            voting_deadline,
        })
        .await;
        Ok(task)
    }

    /// Records a panel auditor's ballot.
    ///
    /// The ballot that completes the panel resolves the dispute in the same
    /// operation: the developer is credited when they win and flagged when
    /// they lose.
    ///
    /// # Errors
    ///
    /// Returns [`super::TaskRegistryError::Domain`] when the caller is not on
    /// the panel, the task is not disputed, the auditor already voted or the
    /// voting window closed.
    pub async fn submit_audit_vote(
        &self,
        task_id: TaskId,
        auditor: &ParticipantId,
        in_favour_of_developer: bool,
    ) -> TaskRegistryResult<VoteStatus> {
        let actor = self.actor(auditor).await?;
        let owner = self.registry_id;
        let (task, status) = self
            .mutate(task_id, |task| {
                task.cast_vote(&actor, in_favour_of_developer, owner, &*self.clock)
            })
            .await?;

        debug!(
            task_id = %task_id,
            votes_for = status.votes_for,
            total_votes = status.total_votes,
            "audit vote recorded"
        );
        self.publish(MarketEvent::AuditorVoteSubmitted {
            task_id,
            auditor: auditor.clone(),
            in_favour_of_developer,
        })
        .await;

        if let Some(developer_won) = status.verdict() {
            self.after_resolution(&task, developer_won).await;
        }
        Ok(status)
    }

    async fn after_resolution(&self, task: &Task, developer_won: bool) {
        let task_id = task.id();
        info!(
            task_id = %task_id,
            developer_won,
            status = %task.status(),
            "dispute resolved"
        );
        self.publish(MarketEvent::DisputeResolved {
            task_id,
            developer_won,
        })
        .await;

        let Some(developer) = task.developer() else {
            return;
        };
        match task.status() {
            TaskStatus::CompletedWithDeveloperWon => self.credit(developer).await,
            TaskStatus::CompletedWithProviderWon => self.flag(developer).await,
            _ => {}
        }
    }
}
