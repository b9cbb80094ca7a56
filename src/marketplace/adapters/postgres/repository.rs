//! `PostgreSQL` repository implementation for marketplace tasks.

use super::{
    models::{NewTaskRow, TaskIdRow, TaskRow},
    schema::market_tasks,
};
use crate::marketplace::{
    domain::{ParticipantId, Role, Task, TaskId, TaskStatus},
    ports::{TaskRepository, TaskRepositoryError, TaskRepositoryResult},
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL` connection pool type used by marketplace adapters.
pub type MarketPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed task repository.
///
/// The full aggregate is stored as JSONB; provider, developer, auditor and
/// status columns duplicate the fields that lookups filter on.
#[derive(Debug, Clone)]
pub struct PostgresTaskRepository {
    pool: MarketPgPool,
}

impl PostgresTaskRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: MarketPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, operation: F) -> TaskRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> TaskRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(TaskRepositoryError::persistence)?;
            operation(&mut connection)
        })
        .await
        .map_err(TaskRepositoryError::persistence)?
    }
}

#[async_trait]
impl TaskRepository for PostgresTaskRepository {
    async fn next_task_id(&self) -> TaskRepositoryResult<TaskId> {
        self.run_blocking(move |connection| {
            let row = diesel::sql_query("SELECT nextval('market_task_ids') AS id")
                .get_result::<TaskIdRow>(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::Unknown, ref info)
                        if info.message().contains("reached maximum value") =>
                    {
                        TaskRepositoryError::SequenceExhausted
                    }
                    _ => TaskRepositoryError::persistence(err),
                })?;
            id_from_column(row.id)
        })
        .await
    }

    async fn store(&self, task: &Task) -> TaskRepositoryResult<()> {
        let task_id = task.id();
        let new_row = to_new_row(task)?;

        self.run_blocking(move |connection| {
            diesel::insert_into(market_tasks::table)
                .values(&new_row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        TaskRepositoryError::DuplicateTask(task_id)
                    }
                    _ => TaskRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn update(&self, task: &Task) -> TaskRepositoryResult<()> {
        let task_id = task.id();
        let row = to_new_row(task)?;

        self.run_blocking(move |connection| {
            let updated_count =
                diesel::update(market_tasks::table.filter(market_tasks::id.eq(row.id)))
                    .set((
                        market_tasks::developer.eq(&row.developer),
                        market_tasks::auditors.eq(&row.auditors),
                        market_tasks::status.eq(&row.status),
                        market_tasks::record.eq(&row.record),
                        market_tasks::updated_at.eq(row.updated_at),
                    ))
                    .execute(connection)
                    .map_err(TaskRepositoryError::persistence)?;

            if updated_count == 0 {
                return Err(TaskRepositoryError::NotFound(task_id));
            }
            Ok(())
        })
        .await
    }

    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        let column_id = id_to_column(id)?;
        self.run_blocking(move |connection| {
            let row = market_tasks::table
                .filter(market_tasks::id.eq(column_id))
                .select(TaskRow::as_select())
                .first::<TaskRow>(connection)
                .optional()
                .map_err(TaskRepositoryError::persistence)?;
            row.map(row_to_task).transpose()
        })
        .await
    }

    async fn list_all(&self) -> TaskRepositoryResult<Vec<Task>> {
        self.run_blocking(move |connection| {
            let rows = market_tasks::table
                .order(market_tasks::id.asc())
                .select(TaskRow::as_select())
                .load::<TaskRow>(connection)
                .map_err(TaskRepositoryError::persistence)?;
            rows.into_iter().map(row_to_task).collect()
        })
        .await
    }

    async fn count(&self) -> TaskRepositoryResult<usize> {
        self.run_blocking(move |connection| {
            let total = market_tasks::table
                .count()
                .get_result::<i64>(connection)
                .map_err(TaskRepositoryError::persistence)?;
            usize::try_from(total).map_err(TaskRepositoryError::persistence)
        })
        .await
    }

    async fn find_ids_for(
        &self,
        participant: &ParticipantId,
        relation: Role,
    ) -> TaskRepositoryResult<Vec<TaskId>> {
        let participant_id = participant.as_str().to_owned();
        self.run_blocking(move |connection| {
            let ids = match relation {
                Role::Provider => market_tasks::table
                    .filter(market_tasks::provider.eq(&participant_id))
                    .order(market_tasks::id.asc())
                    .select(market_tasks::id)
                    .load::<i64>(connection),
                Role::Developer => market_tasks::table
                    .filter(market_tasks::developer.eq(&participant_id))
                    .order(market_tasks::id.asc())
                    .select(market_tasks::id)
                    .load::<i64>(connection),
                Role::Auditor => diesel::sql_query(concat!(
                    "SELECT id FROM market_tasks ",
                    "WHERE $1 = ANY(auditors) ",
                    "ORDER BY id",
                ))
                .bind::<diesel::sql_types::Text, _>(participant_id.as_str())
                .load::<TaskIdRow>(connection)
                .map(|rows| rows.into_iter().map(|row| row.id).collect()),
            }
            .map_err(TaskRepositoryError::persistence)?;
            ids.into_iter().map(id_from_column).collect()
        })
        .await
    }
}

fn id_to_column(id: TaskId) -> TaskRepositoryResult<i64> {
    i64::try_from(id.value()).map_err(TaskRepositoryError::persistence)
}

fn id_from_column(id: i64) -> TaskRepositoryResult<TaskId> {
    u64::try_from(id)
        .map(TaskId::new)
        .map_err(TaskRepositoryError::persistence)
}

fn to_new_row(task: &Task) -> TaskRepositoryResult<NewTaskRow> {
    let record = serde_json::to_value(task).map_err(TaskRepositoryError::persistence)?;

    Ok(NewTaskRow {
        id: id_to_column(task.id())?,
        provider: task.provider().as_str().to_owned(),
        developer: task.developer().map(|developer| developer.as_str().to_owned()),
        auditors: task
            .auditor_candidates()
            .iter()
            .map(|auditor| auditor.as_str().to_owned())
            .collect(),
        status: task.status().as_str().to_owned(),
        record,
        created_at: task.created_at(),
        updated_at: task.updated_at(),
    })
}

fn row_to_task(row: TaskRow) -> TaskRepositoryResult<Task> {
    let TaskRow {
        id,
        status: persisted_status,
        record,
        ..
    } = row;

    let task = serde_json::from_value::<Task>(record).map_err(TaskRepositoryError::persistence)?;
    let status =
        TaskStatus::try_from(persisted_status.as_str()).map_err(TaskRepositoryError::persistence)?;
    if id_from_column(id)? != task.id() || status != task.status() {
        return Err(TaskRepositoryError::persistence(std::io::Error::other(
            format!("task row {id} disagrees with its stored aggregate"),
        )));
    }
    Ok(task)
}
