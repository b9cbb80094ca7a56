//! In-memory protocol treasury.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::marketplace::{
    domain::{Amount, TaskDomainError, TaskId},
    ports::{Treasury, TreasuryError, TreasuryResult},
};

/// Accumulates protocol fees in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTreasury {
    fees: Arc<RwLock<Vec<(TaskId, Amount)>>>,
}

impl InMemoryTreasury {
    /// Creates an empty treasury.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every fee received, in arrival order.
    #[must_use]
    pub fn fees(&self) -> Vec<(TaskId, Amount)> {
        self.fees.read().map(|fees| fees.clone()).unwrap_or_default()
    }

    /// Returns the sum of all fees received.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::AmountOverflow`] if the total overflows.
    pub fn total(&self) -> Result<Amount, TaskDomainError> {
        self.fees()
            .into_iter()
            .try_fold(Amount::ZERO, |total, (_, fee)| total.checked_add(fee))
    }
}

#[async_trait]
impl Treasury for InMemoryTreasury {
    async fn receive_fee(&self, task_id: TaskId, amount: Amount) -> TreasuryResult<()> {
        let mut fees = self.fees.write().map_err(|err| {
            TreasuryError::unavailable(std::io::Error::other(err.to_string()))
        })?;
        fees.push((task_id, amount));
        Ok(())
    }
}
