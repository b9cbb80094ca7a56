//! Read-only registry accessors.

use super::{TaskRegistryResult, TaskRegistryService};
use crate::marketplace::{
    domain::{Amount, Escrow, ParticipantId, Role, Task, TaskDomainError, TaskId, VoteStatus},
    ports::{RoleGate, TaskRepository},
};
use mockable::Clock;

impl<R, G, C> TaskRegistryService<R, G, C>
where
    R: TaskRepository,
    G: RoleGate,
    C: Clock + Send + Sync,
{
    /// Returns the task with `task_id`.
    ///
    /// # Errors
    ///
    /// Returns [`super::TaskRegistryError::TaskNotFound`] for unknown tasks.
    pub async fn task(&self, task_id: TaskId) -> TaskRegistryResult<Task> {
        self.load(task_id).await
    }

    /// Returns the tasks with the given identifiers, in the order requested.
    ///
    /// # Errors
    ///
    /// Returns [`super::TaskRegistryError::TaskNotFound`] on the first unknown
    /// identifier.
    pub async fn tasks(&self, task_ids: &[TaskId]) -> TaskRegistryResult<Vec<Task>> {
        let mut tasks = Vec::with_capacity(task_ids.len());
        for task_id in task_ids {
            tasks.push(self.load(*task_id).await?);
        }
        Ok(tasks)
    }

    /// Returns every task ordered by identifier.
    ///
    /// # Errors
    ///
    /// Returns repository errors.
    pub async fn all_tasks(&self) -> TaskRegistryResult<Vec<Task>> {
        Ok(self.repository.list_all().await?)
    }

    /// Returns how many tasks have been created.
    ///
    /// # Errors
    ///
    /// Returns repository errors.
    pub async fn task_count(&self) -> TaskRegistryResult<usize> {
        Ok(self.repository.count().await?)
    }

    /// Returns the tasks `provider` posted.
    ///
    /// # Errors
    ///
    /// Returns repository errors.
    pub async fn tasks_for_provider(
        &self,
        provider: &ParticipantId,
    ) -> TaskRegistryResult<Vec<TaskId>> {
        Ok(self.repository.find_ids_for(provider, Role::Provider).await?)
    }

    /// Returns the tasks `developer` is assigned to.
    ///
    /// # Errors
    ///
    /// Returns repository errors.
    pub async fn tasks_for_developer(
        &self,
        developer: &ParticipantId,
    ) -> TaskRegistryResult<Vec<TaskId>> {
        Ok(self
            .repository
            .find_ids_for(developer, Role::Developer)
            .await?)
    }

    /// Returns the tasks `auditor` applied to audit.
    ///
    /// # Errors
    ///
    /// Returns repository errors.
    pub async fn tasks_for_auditor(
        &self,
        auditor: &ParticipantId,
    ) -> TaskRegistryResult<Vec<TaskId>> {
        Ok(self.repository.find_ids_for(auditor, Role::Auditor).await?)
    }

    /// Returns the developer applicants of a task.
    ///
    /// # Errors
    ///
    /// Returns [`super::TaskRegistryError::TaskNotFound`] for unknown tasks.
    pub async fn developer_candidates(
        &self,
        task_id: TaskId,
    ) -> TaskRegistryResult<Vec<ParticipantId>> {
        Ok(self.load(task_id).await?.developer_candidates().to_vec())
    }

    /// Returns the auditor applicants of a task.
    ///
    /// # Errors
    ///
    /// Returns [`super::TaskRegistryError::TaskNotFound`] for unknown tasks.
    pub async fn task_auditors(&self, task_id: TaskId) -> TaskRegistryResult<Vec<ParticipantId>> {
        Ok(self.load(task_id).await?.auditor_candidates().to_vec())
    }

    /// Returns the dispute tally of a task.
    ///
    /// # Errors
    ///
    /// Returns [`super::TaskRegistryError::TaskNotFound`] for unknown tasks.
    pub async fn vote_status(&self, task_id: TaskId) -> TaskRegistryResult<VoteStatus> {
        Ok(self.load(task_id).await?.vote_status())
    }

    /// Returns the escrow of a started task.
    ///
    /// # Errors
    ///
    /// Returns [`super::TaskRegistryError::TaskNotFound`] for unknown tasks
    /// and [`TaskDomainError::EscrowMissing`] before start.
    pub async fn escrow(&self, task_id: TaskId) -> TaskRegistryResult<Escrow> {
        self.load(task_id)
            .await?
            .escrow()
            .cloned()
            .ok_or_else(|| TaskDomainError::EscrowMissing(task_id).into())
    }

    /// Returns `true` once `participant` has been paid from the task's escrow.
    ///
    /// # Errors
    ///
    /// Fails like [`Self::escrow`].
    pub async fn has_withdrawn(
        &self,
        task_id: TaskId,
        participant: &ParticipantId,
    ) -> TaskRegistryResult<bool> {
        Ok(self.escrow(task_id).await?.has_withdrawn(participant))
    }

    /// Returns the funds the task's escrow still holds.
    ///
    /// # Errors
    ///
    /// Fails like [`Self::escrow`].
    pub async fn escrow_balance(&self, task_id: TaskId) -> TaskRegistryResult<Amount> {
        Ok(self.escrow(task_id).await?.balance())
    }
}
