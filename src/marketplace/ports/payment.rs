//! Payment gateway port performing outward fund transfers.

use crate::marketplace::domain::{ParticipantId, Payout};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for payment gateway operations.
pub type PaymentResult<T> = Result<T, PaymentError>;

/// Moves funds out of an escrow to a participant.
///
/// The registry calls [`PaymentGateway::transfer`] after the payout has been
/// recorded and without holding its ledger lock, so an implementation may
/// call back into the registry. Such a nested disbursement on the same escrow
/// is rejected while the transfer is outstanding.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Transfers `payout` to its recipient.
    async fn transfer(&self, payout: &Payout) -> PaymentResult<()>;
}

/// Errors returned by payment gateway adapters.
#[derive(Debug, Clone, Error)]
pub enum PaymentError {
    /// The recipient refused the transfer.
    #[error("transfer to {recipient} rejected: {reason}")]
    Rejected {
        /// Intended recipient.
        recipient: ParticipantId,
        /// Reason given by the gateway.
        reason: String,
    },

    /// The gateway could not be reached.
    #[error("payment gateway unavailable: {0}")]
    Unavailable(Arc<dyn std::error::Error + Send + Sync>),
}

impl PaymentError {
    /// Wraps a transport failure.
    pub fn unavailable(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Unavailable(Arc::new(err))
    }
}
