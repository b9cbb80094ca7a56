//! Shared test helpers for `PostgreSQL` integration tests.

use chrono::{DateTime, TimeDelta, Utc};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use pg_embedded_setup_unpriv::TestCluster;
use taskmarket::marketplace::{
    adapters::{memory::ManualClock, postgres::PostgresTaskRepository},
    domain::{Actor, Amount, NewTask, ParticipantId, Role, Task, TaskId},
};
use tokio::runtime::Runtime;

/// Boxed error used by setup helpers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// SQL creating the task table and its identifier sequence.
pub const CREATE_MARKET_TASKS_SQL: &str =
    include_str!("../../migrations/2026-10-01-000000_create_market_tasks/up.sql");

/// Template database name for pre-migrated schema.
pub const TEMPLATE_DB: &str = "taskmarket_test_template";

/// Creates a tokio runtime for async operations in tests.
#[must_use]
pub fn test_runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to create test runtime")
}

/// Ensures the template database exists with the schema applied.
///
/// # Errors
///
/// Returns an error if template creation or migration fails.
pub fn ensure_template(cluster: &TestCluster) -> Result<(), BoxError> {
    cluster
        .ensure_template_exists(TEMPLATE_DB, |db_name| {
            let url = cluster.connection().database_url(db_name);
            let mut conn = PgConnection::establish(&url).map_err(|e| eyre::eyre!("{e}"))?;
            conn.batch_execute(CREATE_MARKET_TASKS_SQL)
                .map_err(|e| eyre::eyre!("migration failed: {e}"))?;
            Ok(())
        })
        .map_err(|e| Box::new(e) as BoxError)?;
    Ok(())
}

/// Creates a test database from the template and returns a repository.
///
/// # Errors
///
/// Returns an error if database creation or pool setup fails.
pub fn setup_repository(
    cluster: &TestCluster,
    db_name: &str,
) -> Result<PostgresTaskRepository, BoxError> {
    cluster
        .create_database_from_template(db_name, TEMPLATE_DB)
        .map_err(|e| Box::new(e) as BoxError)?;
    let url = cluster.connection().database_url(db_name);
    let manager = ConnectionManager::<PgConnection>::new(url);
    let pool = Pool::builder()
        .max_size(1)
        .build(manager)
        .map_err(|e| Box::new(e) as BoxError)?;
    Ok(PostgresTaskRepository::new(pool))
}

/// Returns a fresh database name with `prefix`.
#[must_use]
pub fn database_name(prefix: &str) -> String {
    format!("{prefix}_{}", uuid::Uuid::new_v4().simple())
}

/// Guard that drops the test database even if the test panics.
pub struct CleanupGuard<'a> {
    cluster: &'a TestCluster,
    db_name: String,
}

impl<'a> CleanupGuard<'a> {
    /// Registers `db_name` for cleanup.
    #[must_use]
    pub const fn new(cluster: &'a TestCluster, db_name: String) -> Self {
        Self { cluster, db_name }
    }
}

impl Drop for CleanupGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.cluster.drop_database(self.db_name.as_str()) {
            eprintln!("Warning: failed to drop test database {}: {e}", self.db_name);
        }
    }
}

/// Fixed starting instant for every test clock.
#[must_use]
pub fn epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(1_767_225_600, 0).expect("epoch is representable")
}

/// Returns a validated participant identifier.
#[must_use]
pub fn participant(name: &str) -> ParticipantId {
    ParticipantId::new(name).expect("test participant ids are valid")
}

/// Returns a one-unit task request due three days after the epoch.
#[must_use]
pub fn new_task(title: &str) -> NewTask {
    NewTask {
        title: title.to_owned(),
        description: "persisted through postgres".to_owned(),
        deadline: epoch() + TimeDelta::days(3),
        reward: Amount::UNIT,
    }
}

/// Builds a freshly posted task owned by `provider`.
#[must_use]
pub fn posted(id: u64, provider: &ParticipantId, clock: &ManualClock) -> Task {
    let actor = Actor::new(provider.clone(), Some(Role::Provider));
    Task::create(TaskId::new(id), &actor, new_task(&format!("task {id}")), clock)
        .expect("valid task")
}
