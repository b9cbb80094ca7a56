//! Parallel callers racing on one registry.

use super::helpers::{Marketplace, Staff, marketplace, percent_of_unit};
use async_trait::async_trait;
use rstest::rstest;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use taskmarket::{
    config::MarketplaceConfig,
    marketplace::{
        adapters::memory::InMemoryPaymentLedger,
        domain::{Amount, ErrorKind, Payout, Role, TaskDomainError, TaskId},
        ports::{PaymentGateway, PaymentResult, TaskRepository},
        services::TaskRegistryError,
    },
};
use tokio::task::JoinSet;

/// Gateway that yields mid-transfer and records how many transfers overlap.
#[derive(Default)]
struct SlowGateway {
    ledger: InMemoryPaymentLedger,
    running: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl PaymentGateway for SlowGateway {
    async fn transfer(&self, payout: &Payout) -> PaymentResult<()> {
        let overlapping = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(overlapping, Ordering::SeqCst);
        for _ in 0..64 {
            tokio::task::yield_now().await;
        }
        let result = self.ledger.transfer(payout).await;
        self.running.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_applications_respect_the_cap(marketplace: Marketplace) {
    let provider = marketplace.enrol("acme", Role::Provider);
    let task_id = marketplace.post(&provider).await.expect("task posted");
    let limit = marketplace.registry.config().max_candidates;

    let mut applications = JoinSet::new();
    for index in 0..limit + 5 {
        let developer = marketplace.enrol(&format!("dev-{index}"), Role::Developer);
        let registry = Arc::clone(&marketplace.registry);
        applications.spawn(async move {
            registry
                .apply_for_task_as_developer(task_id, &developer)
                .await
        });
    }

    let mut accepted = 0_usize;
    let mut refused = 0_usize;
    while let Some(joined) = applications.join_next().await {
        match joined.expect("application task completes") {
            Ok(_) => accepted += 1,
            Err(err) => {
                assert_eq!(err.kind(), Some(ErrorKind::Capacity), "{err}");
                refused += 1;
            }
        }
    }
    assert_eq!(accepted, limit);
    assert_eq!(refused, 5);
    let candidates = marketplace
        .registry
        .developer_candidates(task_id)
        .await
        .expect("task exists");
    assert_eq!(candidates.len(), limit);
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_posts_receive_distinct_identifiers(marketplace: Marketplace) {
    let provider = marketplace.enrol("acme", Role::Provider);
    let market = Arc::new(marketplace);

    let mut posts = JoinSet::new();
    for _ in 0..8 {
        let shared = Arc::clone(&market);
        let poster = provider.clone();
        posts.spawn(async move { shared.post(&poster).await });
    }
    let mut ids = Vec::new();
    while let Some(joined) = posts.join_next().await {
        ids.push(joined.expect("post task completes").expect("post succeeds"));
    }
    ids.sort_unstable();
    let expected: Vec<_> = (0..8).map(TaskId::new).collect();
    assert_eq!(ids, expected);
    assert_eq!(
        market.repository.list_all().await.expect("listing").len(),
        8
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_withdrawals_pay_once(marketplace: Marketplace) {
    let staff = Staff::enrol(&marketplace);
    let task_id = staff.start(&marketplace).await.expect("task starts");
    let registry = &marketplace.registry;
    registry
        .complete_task(task_id, &staff.provider)
        .await
        .expect("provider completes");

    let mut withdrawals = JoinSet::new();
    for _ in 0..4 {
        let shared = Arc::clone(registry);
        let developer = staff.developer.clone();
        withdrawals.spawn(async move { shared.withdraw_payment(task_id, &developer).await });
    }
    let mut paid = 0_usize;
    while let Some(joined) = withdrawals.join_next().await {
        match joined.expect("withdrawal task completes") {
            Ok(_) => paid += 1,
            Err(TaskRegistryError::Domain(err)) => {
                assert!(
                    matches!(err, TaskDomainError::AlreadyWithdrawn { .. }),
                    "{err}"
                );
            }
            Err(other) => panic!("unexpected failure: {other}"),
        }
    }
    assert_eq!(paid, 1);
    assert_eq!(marketplace.payments.transfers().len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_withdrawals_by_different_parties_queue() {
    let gateway = Arc::new(SlowGateway::default());
    let handle = Arc::clone(&gateway);
    let marketplace =
        Marketplace::with_collaborators(MarketplaceConfig::default(), move |collaborators| {
            collaborators.payments = handle;
        });
    let staff = Staff::enrol(&marketplace);
    let task_id = staff.start(&marketplace).await.expect("task starts");
    let registry = &marketplace.registry;
    registry
        .submit_work(task_id, &staff.developer)
        .await
        .expect("developer submits");
    registry
        .initiate_dispute(task_id, &staff.provider)
        .await
        .expect("provider disputes");
    for auditor in &staff.auditors {
        registry
            .submit_audit_vote(task_id, auditor, true)
            .await
            .expect("panel auditor votes");
    }

    let mut withdrawals = JoinSet::new();
    let recipients = std::iter::once(&staff.developer).chain(&staff.auditors);
    for recipient in recipients.cloned() {
        let shared = Arc::clone(registry);
        withdrawals.spawn(async move { shared.withdraw_payment(task_id, &recipient).await });
    }
    while let Some(joined) = withdrawals.join_next().await {
        let payout = joined
            .expect("withdrawal task completes")
            .expect("every party is paid");
        assert!(payout.amount() > Amount::ZERO);
    }

    assert_eq!(gateway.ledger.transfers().len(), 4);
    assert_eq!(gateway.peak.load(Ordering::SeqCst), 1);
    assert_eq!(
        gateway.ledger.balance_of(&staff.developer),
        percent_of_unit(67)
    );
    for auditor in &staff.auditors {
        assert_eq!(gateway.ledger.balance_of(auditor), percent_of_unit(10));
    }
    assert_eq!(
        registry.escrow_balance(task_id).await.expect("escrow exists"),
        Amount::ZERO
    );
}
