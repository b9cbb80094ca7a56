//! In-memory task repository.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use crate::marketplace::{
    domain::{ParticipantId, Role, Task, TaskId},
    ports::{TaskRepository, TaskRepositoryError, TaskRepositoryResult},
};

/// Thread-safe in-memory task repository.
///
/// Tasks live in an arena keyed by identifier; participant indexes are
/// rebuilt from the aggregate on every write.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskRepository {
    state: Arc<RwLock<InMemoryTaskState>>,
}

#[derive(Debug, Default)]
struct InMemoryTaskState {
    next_id: Option<TaskId>,
    exhausted: bool,
    tasks: BTreeMap<TaskId, Task>,
    participant_index: HashMap<(Role, ParticipantId), BTreeSet<TaskId>>,
}

impl InMemoryTaskRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(err: impl std::fmt::Display) -> TaskRepositoryError {
    TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

fn relations(task: &Task) -> Vec<(Role, ParticipantId)> {
    let mut related = vec![(Role::Provider, task.provider().clone())];
    if let Some(developer) = task.developer() {
        related.push((Role::Developer, developer.clone()));
    }
    related.extend(
        task.auditor_candidates()
            .iter()
            .map(|auditor| (Role::Auditor, auditor.clone())),
    );
    related
}

fn index_task(state: &mut InMemoryTaskState, task: &Task) {
    for key in relations(task) {
        state
            .participant_index
            .entry(key)
            .or_default()
            .insert(task.id());
    }
}

fn unindex_task(state: &mut InMemoryTaskState, task: &Task) {
    for key in relations(task) {
        if let Some(ids) = state.participant_index.get_mut(&key) {
            ids.remove(&task.id());
            if ids.is_empty() {
                state.participant_index.remove(&key);
            }
        }
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn next_task_id(&self) -> TaskRepositoryResult<TaskId> {
        let mut state = self.state.write().map_err(lock_error)?;
        if state.exhausted {
            return Err(TaskRepositoryError::SequenceExhausted);
        }
        let id = state.next_id.unwrap_or(TaskId::FIRST);
        match id.next() {
            Some(next) => state.next_id = Some(next),
            None => state.exhausted = true,
        }
        Ok(id)
    }

    async fn store(&self, task: &Task) -> TaskRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        if state.tasks.contains_key(&task.id()) {
            return Err(TaskRepositoryError::DuplicateTask(task.id()));
        }
        index_task(&mut state, task);
        state.tasks.insert(task.id(), task.clone());
        Ok(())
    }

    async fn update(&self, task: &Task) -> TaskRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        let old_task = state
            .tasks
            .get(&task.id())
            .ok_or(TaskRepositoryError::NotFound(task.id()))?
            .clone();

        unindex_task(&mut state, &old_task);
        index_task(&mut state, task);
        state.tasks.insert(task.id(), task.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn list_all(&self) -> TaskRepositoryResult<Vec<Task>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.tasks.values().cloned().collect())
    }

    async fn count(&self) -> TaskRepositoryResult<usize> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.tasks.len())
    }

    async fn find_ids_for(
        &self,
        participant: &ParticipantId,
        relation: Role,
    ) -> TaskRepositoryResult<Vec<TaskId>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state
            .participant_index
            .get(&(relation, participant.clone()))
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default())
    }
}
