//! Contract tests for the in-memory task repository.

use super::helpers::{epoch, participant};
use chrono::TimeDelta;
use mockable::Clock;
use rstest::{fixture, rstest};
use taskmarket::marketplace::{
    adapters::memory::{InMemoryTaskRepository, ManualClock},
    domain::{Actor, Amount, NewTask, Role, Task, TaskId},
    ports::{TaskRepository, TaskRepositoryError},
};

#[fixture]
fn repo() -> InMemoryTaskRepository {
    InMemoryTaskRepository::new()
}

fn posted(id: u64, provider: &str, clock: &impl Clock) -> Task {
    let actor = Actor::new(participant(provider), Some(Role::Provider));
    Task::create(
        TaskId::new(id),
        &actor,
        NewTask {
            title: format!("task {id}"),
            description: "repository contract".to_owned(),
            deadline: epoch() + TimeDelta::days(1),
            reward: Amount::UNIT,
        },
        clock,
    )
    .expect("valid task")
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn identifiers_are_issued_in_sequence(repo: InMemoryTaskRepository) {
    for expected in 0..3 {
        let id = repo.next_task_id().await.expect("sequence available");
        assert_eq!(id, TaskId::new(expected));
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn duplicate_store_is_rejected(repo: InMemoryTaskRepository) {
    let clock = ManualClock::new(epoch());
    let task = posted(0, "acme", &clock);
    repo.store(&task).await.expect("first store succeeds");
    let duplicate = repo.store(&task).await;
    assert!(matches!(
        duplicate,
        Err(TaskRepositoryError::DuplicateTask(id)) if id == task.id()
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn update_of_unknown_task_is_not_found(repo: InMemoryTaskRepository) {
    let clock = ManualClock::new(epoch());
    let task = posted(5, "acme", &clock);
    let result = repo.update(&task).await;
    assert!(matches!(result, Err(TaskRepositoryError::NotFound(_))));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn list_all_is_ordered_by_identifier(repo: InMemoryTaskRepository) {
    let clock = ManualClock::new(epoch());
    for id in [2, 0, 1] {
        repo.store(&posted(id, "acme", &clock))
            .await
            .expect("store succeeds");
    }
    let ids: Vec<_> = repo
        .list_all()
        .await
        .expect("listing succeeds")
        .iter()
        .map(Task::id)
        .collect();
    assert_eq!(ids, [TaskId::new(0), TaskId::new(1), TaskId::new(2)]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn count_tracks_stored_tasks_only(repo: InMemoryTaskRepository) {
    assert_eq!(repo.count().await.expect("count succeeds"), 0);
    let clock = ManualClock::new(epoch());
    repo.next_task_id().await.expect("sequence available");
    repo.store(&posted(1, "acme", &clock))
        .await
        .expect("store succeeds");
    assert_eq!(repo.count().await.expect("count succeeds"), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn participant_index_tracks_updates(repo: InMemoryTaskRepository) {
    let clock = ManualClock::new(epoch());
    let mut task = posted(0, "acme", &clock);
    repo.store(&task).await.expect("store succeeds");
    repo.store(&posted(1, "globex", &clock))
        .await
        .expect("store succeeds");

    let developer = Actor::new(participant("dev-ada"), Some(Role::Developer));
    task.apply_as_developer(&developer, 15, &clock)
        .expect("developer applies");
    task.assign_developer(
        &Actor::new(participant("acme"), Some(Role::Provider)),
        developer.participant(),
        &clock,
    )
    .expect("developer assigned");
    repo.update(&task).await.expect("update succeeds");

    let provided = repo
        .find_ids_for(&participant("acme"), Role::Provider)
        .await
        .expect("lookup succeeds");
    assert_eq!(provided, [TaskId::new(0)]);
    let developing = repo
        .find_ids_for(developer.participant(), Role::Developer)
        .await
        .expect("lookup succeeds");
    assert_eq!(developing, [TaskId::new(0)]);
    let auditing = repo
        .find_ids_for(developer.participant(), Role::Auditor)
        .await
        .expect("lookup succeeds");
    assert!(auditing.is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn stored_task_round_trips(repo: InMemoryTaskRepository) {
    let clock = ManualClock::new(epoch());
    let task = posted(0, "acme", &clock);
    repo.store(&task).await.expect("store succeeds");
    let found = repo
        .find_by_id(TaskId::FIRST)
        .await
        .expect("lookup succeeds");
    assert_eq!(found, Some(task));
    assert_eq!(
        repo.find_by_id(TaskId::new(9)).await.expect("lookup succeeds"),
        None
    );
}
