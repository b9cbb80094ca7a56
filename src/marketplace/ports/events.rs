//! Event publisher port for committed domain events.

use crate::marketplace::domain::MarketEvent;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for event publishing.
pub type EventPublishResult<T> = Result<T, EventPublishError>;

/// Sink for marketplace events.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes an event describing a committed operation.
    async fn publish(&self, event: &MarketEvent) -> EventPublishResult<()>;
}

/// Errors returned by event publisher adapters.
#[derive(Debug, Clone, Error)]
pub enum EventPublishError {
    /// The sink could not accept the event.
    #[error("event sink unavailable: {0}")]
    Unavailable(Arc<dyn std::error::Error + Send + Sync>),
}

impl EventPublishError {
    /// Wraps a sink failure.
    pub fn unavailable(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Unavailable(Arc::new(err))
    }
}
