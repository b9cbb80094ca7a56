//! In-memory payment gateway crediting participant balances.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::marketplace::{
    domain::{Amount, ParticipantId, Payout},
    ports::{PaymentError, PaymentGateway, PaymentResult},
};

/// Credits payouts to in-memory balances.
///
/// Recipients can be configured to refuse transfers, which exercises the
/// registry's rollback path.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentLedger {
    state: Arc<RwLock<PaymentState>>,
}

#[derive(Debug, Default)]
struct PaymentState {
    balances: HashMap<ParticipantId, Amount>,
    transfers: Vec<Payout>,
    refusing: HashSet<ParticipantId>,
}

impl InMemoryPaymentLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the funds received by `participant`.
    #[must_use]
    pub fn balance_of(&self, participant: &ParticipantId) -> Amount {
        self.state
            .read()
            .map(|state| state.balances.get(participant).copied().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Returns every successful transfer, in order.
    #[must_use]
    pub fn transfers(&self) -> Vec<Payout> {
        self.state
            .read()
            .map(|state| state.transfers.clone())
            .unwrap_or_default()
    }

    /// Makes transfers to `participant` fail until [`Self::accept_transfers_to`].
    pub fn refuse_transfers_to(&self, participant: &ParticipantId) {
        if let Ok(mut state) = self.state.write() {
            state.refusing.insert(participant.clone());
        }
    }

    /// Lets transfers to `participant` succeed again.
    pub fn accept_transfers_to(&self, participant: &ParticipantId) {
        if let Ok(mut state) = self.state.write() {
            state.refusing.remove(participant);
        }
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentLedger {
    async fn transfer(&self, payout: &Payout) -> PaymentResult<()> {
        let mut state = self.state.write().map_err(|err| {
            PaymentError::unavailable(std::io::Error::other(err.to_string()))
        })?;
        let recipient = payout.recipient();
        if state.refusing.contains(recipient) {
            return Err(PaymentError::Rejected {
                recipient: recipient.clone(),
                reason: "recipient refuses transfers".to_owned(),
            });
        }
        let balance = state.balances.entry(recipient.clone()).or_default();
        *balance = balance
            .checked_add(payout.amount())
            .map_err(PaymentError::unavailable)?;
        state.transfers.push(payout.clone());
        Ok(())
    }
}
