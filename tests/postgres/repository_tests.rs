//! Task repository contract tests against the `market_tasks` schema.

use crate::postgres::helpers::{
    CleanupGuard, database_name, ensure_template, epoch, participant, posted, setup_repository,
    test_runtime,
};
use pg_embedded_setup_unpriv::TestCluster;
use pg_embedded_setup_unpriv::test_support::shared_test_cluster;
use rstest::rstest;
use taskmarket::marketplace::{
    adapters::memory::ManualClock,
    domain::{Actor, Amount, ParticipantId, RegistryId, Role, Task, TaskId, TaskStatus},
    ports::{TaskRepository, TaskRepositoryError},
};

const CANDIDATE_LIMIT: usize = 15;

/// Builds task `id` staffed with a developer and three auditors, then starts it.
fn started(id: u64, clock: &ManualClock) -> Task {
    let provider = Actor::new(participant("acme"), Some(Role::Provider));
    let developer = Actor::new(participant("dev-ada"), Some(Role::Developer));
    let mut task = posted(id, provider.participant(), clock);
    task.apply_as_developer(&developer, CANDIDATE_LIMIT, clock)
        .expect("developer applies");
    for name in ["aud-1", "aud-2", "aud-3"] {
        let auditor = Actor::new(participant(name), Some(Role::Auditor));
        task.apply_as_auditor(&auditor, CANDIDATE_LIMIT, clock)
            .expect("auditor applies");
    }
    task.assign_developer(&provider, developer.participant(), clock)
        .expect("developer assigned");
    task.start(&provider, Amount::UNIT, RegistryId::new(), clock)
        .expect("task starts");
    task
}

#[rstest]
fn identifiers_start_at_zero_and_never_repeat(shared_test_cluster: &'static TestCluster) {
    ensure_template(shared_test_cluster).expect("template setup");
    let db_name = database_name("test_task_ids");
    let _guard = CleanupGuard::new(shared_test_cluster, db_name.clone());
    let repo = setup_repository(shared_test_cluster, &db_name).expect("repository setup");

    let rt = test_runtime();
    for expected in 0..3 {
        let id = rt
            .block_on(repo.next_task_id())
            .expect("sequence available");
        assert_eq!(id, TaskId::new(expected));
    }
}

#[rstest]
fn started_task_round_trips_with_its_escrow(shared_test_cluster: &'static TestCluster) {
    ensure_template(shared_test_cluster).expect("template setup");
    let db_name = database_name("test_task_round_trip");
    let _guard = CleanupGuard::new(shared_test_cluster, db_name.clone());
    let repo = setup_repository(shared_test_cluster, &db_name).expect("repository setup");

    let clock = ManualClock::new(epoch());
    let task = started(0, &clock);
    let rt = test_runtime();
    rt.block_on(repo.store(&task)).expect("store succeeds");

    let found = rt
        .block_on(repo.find_by_id(TaskId::FIRST))
        .expect("lookup succeeds")
        .expect("task exists");
    assert_eq!(found, task);
    assert_eq!(found.status(), TaskStatus::InProgress);
    assert!(found.escrow().is_some());
    assert_eq!(
        rt.block_on(repo.find_by_id(TaskId::new(9)))
            .expect("lookup succeeds"),
        None
    );
}

#[rstest]
fn duplicate_store_is_rejected(shared_test_cluster: &'static TestCluster) {
    ensure_template(shared_test_cluster).expect("template setup");
    let db_name = database_name("test_task_duplicate");
    let _guard = CleanupGuard::new(shared_test_cluster, db_name.clone());
    let repo = setup_repository(shared_test_cluster, &db_name).expect("repository setup");

    let clock = ManualClock::new(epoch());
    let task = posted(0, &participant("acme"), &clock);
    let rt = test_runtime();
    rt.block_on(repo.store(&task)).expect("first store succeeds");
    let duplicate = rt.block_on(repo.store(&task));
    assert!(matches!(
        duplicate,
        Err(TaskRepositoryError::DuplicateTask(id)) if id == task.id()
    ));
}

#[rstest]
fn update_of_unknown_task_is_not_found(shared_test_cluster: &'static TestCluster) {
    ensure_template(shared_test_cluster).expect("template setup");
    let db_name = database_name("test_task_update_missing");
    let _guard = CleanupGuard::new(shared_test_cluster, db_name.clone());
    let repo = setup_repository(shared_test_cluster, &db_name).expect("repository setup");

    let clock = ManualClock::new(epoch());
    let task = posted(5, &participant("acme"), &clock);
    let result = test_runtime().block_on(repo.update(&task));
    assert!(matches!(
        result,
        Err(TaskRepositoryError::NotFound(id)) if id == TaskId::new(5)
    ));
}

#[rstest]
fn listing_is_ordered_and_counted(shared_test_cluster: &'static TestCluster) {
    ensure_template(shared_test_cluster).expect("template setup");
    let db_name = database_name("test_task_listing");
    let _guard = CleanupGuard::new(shared_test_cluster, db_name.clone());
    let repo = setup_repository(shared_test_cluster, &db_name).expect("repository setup");

    let clock = ManualClock::new(epoch());
    let rt = test_runtime();
    assert_eq!(rt.block_on(repo.count()).expect("count succeeds"), 0);
    for id in [2, 0, 1] {
        rt.block_on(repo.store(&posted(id, &participant("acme"), &clock)))
            .expect("store succeeds");
    }

    let ids: Vec<_> = rt
        .block_on(repo.list_all())
        .expect("listing succeeds")
        .iter()
        .map(Task::id)
        .collect();
    assert_eq!(ids, [TaskId::new(0), TaskId::new(1), TaskId::new(2)]);
    assert_eq!(rt.block_on(repo.count()).expect("count succeeds"), 3);
}

#[rstest]
fn participant_lookups_follow_updates(shared_test_cluster: &'static TestCluster) {
    ensure_template(shared_test_cluster).expect("template setup");
    let db_name = database_name("test_task_lookups");
    let _guard = CleanupGuard::new(shared_test_cluster, db_name.clone());
    let repo = setup_repository(shared_test_cluster, &db_name).expect("repository setup");

    let clock = ManualClock::new(epoch());
    let rt = test_runtime();
    rt.block_on(repo.store(&posted(0, &participant("acme"), &clock)))
        .expect("store succeeds");
    rt.block_on(repo.store(&posted(1, &participant("globex"), &clock)))
        .expect("store succeeds");
    rt.block_on(repo.update(&started(0, &clock)))
        .expect("update succeeds");

    let lookup = |who: &str, relation: Role| {
        rt.block_on(repo.find_ids_for(&participant(who), relation))
            .expect("lookup succeeds")
    };
    assert_eq!(lookup("acme", Role::Provider), [TaskId::new(0)]);
    assert_eq!(lookup("globex", Role::Provider), [TaskId::new(1)]);
    assert_eq!(lookup("dev-ada", Role::Developer), [TaskId::new(0)]);
    assert_eq!(lookup("aud-2", Role::Auditor), [TaskId::new(0)]);
    assert!(lookup("aud-4", Role::Auditor).is_empty());
    assert!(lookup("acme", Role::Auditor).is_empty());
}

#[rstest]
fn longest_participant_id_fits_the_schema(shared_test_cluster: &'static TestCluster) {
    ensure_template(shared_test_cluster).expect("template setup");
    let db_name = database_name("test_task_long_ids");
    let _guard = CleanupGuard::new(shared_test_cluster, db_name.clone());
    let repo = setup_repository(shared_test_cluster, &db_name).expect("repository setup");

    let provider = participant(&"p".repeat(ParticipantId::MAX_LEN));
    let clock = ManualClock::new(epoch());
    let rt = test_runtime();
    rt.block_on(repo.store(&posted(0, &provider, &clock)))
        .expect("store succeeds");
    assert_eq!(
        rt.block_on(repo.find_ids_for(&provider, Role::Provider))
            .expect("lookup succeeds"),
        [TaskId::FIRST]
    );
}
