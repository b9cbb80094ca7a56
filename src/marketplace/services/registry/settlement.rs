//! Escrow disbursements.
//!
//! A disbursement is recorded on the escrow and persisted before the ledger
//! lock is released and the payment gateway is called. The transfer outcome
//! is then written back: success clears the in-flight marker, failure rolls
//! the accounting back so the recipient can try again.
//!
//! Disbursements from one escrow queue on a per-task gate held from the
//! reservation until the outcome is recorded, so concurrent withdrawals by
//! different parties run one after another. A call made from inside a
//! pending transfer cannot wait on that gate and is refused instead.

use super::{TaskRegistryResult, TaskRegistryService};
use crate::marketplace::{
    domain::{MarketEvent, ParticipantId, Payout, Task, TaskDomainError, TaskId},
    ports::{PaymentError, RoleGate, TaskRepository},
};
use mockable::Clock;
use std::collections::BTreeSet;
use std::convert;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

tokio::task_local! {
    static TRANSFERS_IN_PROGRESS: BTreeSet<TaskId>;
}

/// Outcome of a transfer whose result was never written back to the escrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The funds reached the recipient.
    Completed,
    /// The funds never left the escrow.
    Failed,
}

fn transfer_in_progress(task_id: TaskId) -> bool {
    TRANSFERS_IN_PROGRESS
        .try_with(|active| active.contains(&task_id))
        .unwrap_or(false)
}

impl<R, G, C> TaskRegistryService<R, G, C>
where
    R: TaskRepository,
    G: RoleGate,
    C: Clock + Send + Sync,
{
    /// Pays the caller's developer reward or auditor share.
    ///
    /// Waits for any other disbursement from the same escrow to finish.
    ///
    /// # Errors
    ///
    /// Returns [`super::TaskRegistryError::Domain`] when the caller is a
    /// provider, unrelated to the task, already paid or owed nothing. It also
    /// fails with [`TaskDomainError::DisbursementInFlight`] when called from
    /// inside a transfer of the same escrow or while an unreconciled payout is
    /// pending. [`super::TaskRegistryError::Payment`] reports a failed
    /// transfer that was rolled back.
    pub async fn withdraw_payment(
        &self,
        task_id: TaskId,
        participant: &ParticipantId,
    ) -> TaskRegistryResult<Payout> {
        let actor = self.actor(participant).await?;
        let owner = self.registry_id;
        self.disburse(task_id, |task| task.begin_withdrawal(&actor, owner))
            .await
    }

    /// Refunds the provider under the escrow's settlement outcome.
    ///
    /// # Errors
    ///
    /// Returns [`super::TaskRegistryError::Domain`] when the caller is not the
    /// task's provider, was already refunded or is owed nothing, and fails
    /// like [`Self::withdraw_payment`] for in-flight and failed transfers.
    pub async fn refund_provider(
        &self,
        task_id: TaskId,
        provider: &ParticipantId,
    ) -> TaskRegistryResult<Payout> {
        let actor = self.actor(provider).await?;
        let owner = self.registry_id;
        self.disburse(task_id, |task| task.begin_refund(&actor, owner))
            .await
    }

    /// Settles a payout left in flight by an interrupted disbursement.
    ///
    /// Operators call this after checking the payment gateway's records.
    /// Payment events are only published by the disbursement that made the
    /// transfer. [`TransferOutcome::Completed`] confirms the payout;
    /// [`TransferOutcome::Failed`] restores the balance and lets the
    /// recipient withdraw again.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::NoDisbursementInFlight`] when nothing is
    /// pending and [`TaskDomainError::DisbursementInFlight`] when called from
    /// inside a transfer of the same escrow.
    pub async fn reconcile_disbursement(
        &self,
        task_id: TaskId,
        outcome: TransferOutcome,
    ) -> TaskRegistryResult<Payout> {
        if transfer_in_progress(task_id) {
            return Err(self.refuse_nested(task_id).await);
        }
        let gate = self.disbursement_gate(task_id).await;
        let _turn = gate.lock().await;

        let owner = self.registry_id;
        let (_, payout) = self
            .mutate(task_id, |task| match outcome {
                TransferOutcome::Completed => task.complete_disbursement(owner),
                TransferOutcome::Failed => task.revert_disbursement(owner),
            })
            .await?;
        info!(
            task_id = %task_id,
            recipient = %payout.recipient(),
            amount = %payout.amount(),
            outcome = ?outcome,
            "pending disbursement reconciled"
        );
        Ok(payout)
    }

    async fn disburse<F>(&self, task_id: TaskId, reserve: F) -> TaskRegistryResult<Payout>
    where
        F: FnOnce(&mut Task) -> Result<Payout, TaskDomainError> + Send,
    {
        if transfer_in_progress(task_id) {
            return Err(self.refuse_nested(task_id).await);
        }
        let gate = self.disbursement_gate(task_id).await;
        let _turn = gate.lock().await;

        let (_, payout) = self.mutate(task_id, reserve).await?;
        let active = TRANSFERS_IN_PROGRESS
            .try_with(|active| {
                let mut nested = active.clone();
                nested.insert(task_id);
                nested
            })
            .unwrap_or_else(|_| BTreeSet::from([task_id]));
        let transfer = TRANSFERS_IN_PROGRESS
            .scope(active, self.collaborators.payments.transfer(&payout))
            .await;

        match transfer {
            Ok(()) => Ok(self.confirm(task_id, payout).await),
            Err(err) => Err(self.roll_back(task_id, &payout, err).await.into()),
        }
    }

    /// Records a successful transfer.
    ///
    /// The funds have moved, so a failed write is logged and the payout stays
    /// in flight until it is reconciled.
    async fn confirm(&self, task_id: TaskId, payout: Payout) -> Payout {
        let owner = self.registry_id;
        let recorded = self
            .mutate(task_id, |task| task.complete_disbursement(owner))
            .await;
        self.publish(MarketEvent::paid(&payout)).await;
        let Err(err) = recorded else {
            info!(
                task_id = %task_id,
                recipient = %payout.recipient(),
                amount = %payout.amount(),
                kind = ?payout.kind(),
                "disbursement completed"
            );
            return payout;
        };
        warn!(
            task_id = %task_id,
            recipient = %payout.recipient(),
            amount = %payout.amount(),
            error = %err,
            "transfer succeeded but was not recorded, escrow needs reconciling"
        );
        payout
    }

    async fn roll_back(&self, task_id: TaskId, payout: &Payout, err: PaymentError) -> PaymentError {
        warn!(
            task_id = %task_id,
            recipient = %payout.recipient(),
            amount = %payout.amount(),
            error = %err,
            "transfer failed, rolling back disbursement"
        );
        let owner = self.registry_id;
        if let Err(revert_err) = self
            .mutate(task_id, |task| task.revert_disbursement(owner))
            .await
        {
            warn!(
                task_id = %task_id,
                error = %revert_err,
                "rollback was not recorded, escrow needs reconciling"
            );
        }
        err
    }

    async fn disbursement_gate(&self, task_id: TaskId) -> Arc<Mutex<()>> {
        let mut gates = self.disbursement_gates.lock().await;
        Arc::clone(gates.entry(task_id).or_default())
    }

    async fn refuse_nested(&self, task_id: TaskId) -> super::TaskRegistryError {
        self.escrow(task_id).await.map_or_else(convert::identity, |escrow| {
            TaskDomainError::DisbursementInFlight(escrow.id()).into()
        })
    }
}
