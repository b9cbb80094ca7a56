//! In-memory event log.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::marketplace::{
    domain::{MarketEvent, TaskId},
    ports::{EventPublishError, EventPublishResult, EventPublisher},
};

/// Records published events in order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventLog {
    events: Arc<RwLock<Vec<MarketEvent>>>,
}

impl InMemoryEventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every event published so far.
    #[must_use]
    pub fn events(&self) -> Vec<MarketEvent> {
        self.events
            .read()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Returns the events concerning `task_id`.
    #[must_use]
    pub fn events_for(&self, task_id: TaskId) -> Vec<MarketEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.task_id() == task_id)
            .collect()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventLog {
    async fn publish(&self, event: &MarketEvent) -> EventPublishResult<()> {
        let mut events = self.events.write().map_err(|err| {
            EventPublishError::unavailable(std::io::Error::other(err.to_string()))
        })?;
        events.push(event.clone());
        Ok(())
    }
}
