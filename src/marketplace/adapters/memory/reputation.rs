//! In-memory achievement and redflag counters.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::marketplace::{
    domain::ParticipantId,
    ports::{AchievementLedger, RedflagLedger, ReputationError, ReputationResult},
};

/// Counts completed tasks and strikes per developer.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReputationLedger {
    state: Arc<RwLock<ReputationState>>,
}

#[derive(Debug, Default)]
struct ReputationState {
    completed: HashMap<ParticipantId, u32>,
    redflags: HashMap<ParticipantId, u32>,
}

impl InMemoryReputationLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many completions were recorded for `developer`.
    #[must_use]
    pub fn completed_tasks(&self, developer: &ParticipantId) -> u32 {
        self.state
            .read()
            .map(|state| state.completed.get(developer).copied().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Returns how many strikes were recorded for `developer`.
    #[must_use]
    pub fn redflags(&self, developer: &ParticipantId) -> u32 {
        self.state
            .read()
            .map(|state| state.redflags.get(developer).copied().unwrap_or_default())
            .unwrap_or_default()
    }

    fn write(&self) -> ReputationResult<std::sync::RwLockWriteGuard<'_, ReputationState>> {
        self.state
            .write()
            .map_err(|err| ReputationError::unavailable(std::io::Error::other(err.to_string())))
    }
}

fn bump(counts: &mut HashMap<ParticipantId, u32>, developer: &ParticipantId) {
    let count = counts.entry(developer.clone()).or_default();
    *count = count.saturating_add(1);
}

#[async_trait]
impl AchievementLedger for InMemoryReputationLedger {
    async fn record_task_completed(&self, developer: &ParticipantId) -> ReputationResult<()> {
        let mut state = self.write()?;
        bump(&mut state.completed, developer);
        Ok(())
    }
}

#[async_trait]
impl RedflagLedger for InMemoryReputationLedger {
    async fn record_lost_dispute(&self, developer: &ParticipantId) -> ReputationResult<()> {
        let mut state = self.write()?;
        bump(&mut state.redflags, developer);
        Ok(())
    }
}
