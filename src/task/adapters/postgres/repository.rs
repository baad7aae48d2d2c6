//! `PostgreSQL` repository implementation for task lifecycle storage.

use super::{
    models::{NewTaskRow, TaskLifecycleChangeset, TaskResultRow, TaskRow},
    schema::{task_results, tasks},
};
use crate::counter::{ApiToken, CounterId};
use crate::persistence::{PgPool, get_conn_with, run_blocking_with};
use crate::task::{
    domain::{
        PersistedTaskData, ScoredVisit, Task, TaskId, TaskParams, TaskResult, TaskStatus,
    },
    ports::{TaskRepository, TaskRepositoryError, TaskRepositoryResult},
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL`-backed task repository.
#[derive(Debug, Clone)]
pub struct PostgresTaskRepository {
    pool: PgPool,
}

impl PostgresTaskRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> TaskRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> TaskRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        run_blocking_with(
            move || {
                let mut connection = get_conn_with(&pool, TaskRepositoryError::persistence)?;
                f(&mut connection)
            },
            TaskRepositoryError::persistence,
        )
        .await
    }
}

#[async_trait]
impl TaskRepository for PostgresTaskRepository {
    async fn store(&self, task: &Task) -> TaskRepositoryResult<()> {
        let task_id = task.id();
        let new_row = to_new_row(task);
        self.run_blocking(move |connection| {
            diesel::insert_into(tasks::table)
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
        let changeset = to_changeset(task);
        self.run_blocking(move |connection| {
            let updated = diesel::update(tasks::table.find(task_id.into_inner()))
                .set(&changeset)
                .execute(connection)
                .map_err(TaskRepositoryError::persistence)?;
            if updated == 0 {
                return Err(TaskRepositoryError::NotFound(task_id));
            }
            Ok(())
        })
        .await
    }

    async fn store_completion(
        &self,
        task: &Task,
        result: &TaskResult,
    ) -> TaskRepositoryResult<()> {
        let task_id = task.id();
        let changeset = to_changeset(task);
        let result_row = to_result_row(task, result)?;
        self.run_blocking(move |connection| {
            connection
                .transaction::<_, DieselError, _>(|tx| {
                    let updated = diesel::update(tasks::table.find(task_id.into_inner()))
                        .set(&changeset)
                        .execute(tx)?;
                    if updated == 0 {
                        return Err(DieselError::NotFound);
                    }
                    diesel::insert_into(task_results::table)
                        .values(&result_row)
                        .execute(tx)?;
                    Ok(())
                })
                .map_err(|err| match err {
                    DieselError::NotFound => TaskRepositoryError::NotFound(task_id),
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        TaskRepositoryError::ResultAlreadyStored(task_id)
                    }
                    _ => TaskRepositoryError::persistence(err),
                })
        })
        .await
    }

    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        self.run_blocking(move |connection| {
            let row = tasks::table
                .find(id.into_inner())
                .select(TaskRow::as_select())
                .first::<TaskRow>(connection)
                .optional()
                .map_err(TaskRepositoryError::persistence)?;
            row.map(row_to_task).transpose()
        })
        .await
    }

    async fn list(&self, status: Option<TaskStatus>) -> TaskRepositoryResult<Vec<Task>> {
        self.run_blocking(move |connection| {
            let mut query = tasks::table
                .select(TaskRow::as_select())
                .order((tasks::created_at.asc(), tasks::id.asc()))
                .into_boxed();
            if let Some(wanted) = status {
                query = query.filter(tasks::status.eq(wanted.as_str()));
            }
            let rows = query
                .load::<TaskRow>(connection)
                .map_err(TaskRepositoryError::persistence)?;
            rows.into_iter().map(row_to_task).collect()
        })
        .await
    }

    async fn find_result(&self, id: TaskId) -> TaskRepositoryResult<Option<TaskResult>> {
        self.run_blocking(move |connection| {
            let row = task_results::table
                .find(id.into_inner())
                .select(TaskResultRow::as_select())
                .first::<TaskResultRow>(connection)
                .optional()
                .map_err(TaskRepositoryError::persistence)?;
            row.map(row_to_result).transpose()
        })
        .await
    }
}

pub(super) fn to_new_row(task: &Task) -> NewTaskRow {
    let params = task.params();
    NewTaskRow {
        id: task.id().into_inner(),
        date: params.date(),
        counter_id: params.counter().as_i64(),
        token: params.token().expose().to_owned(),
        status: task.status().as_str().to_owned(),
        progress: i16::from(task.progress()),
        message: task.message().to_owned(),
        error: task.error().map(str::to_owned),
        created_at: task.created_at(),
        started_at: task.started_at(),
        finished_at: task.finished_at(),
        updated_at: task.updated_at(),
    }
}

fn to_changeset(task: &Task) -> TaskLifecycleChangeset {
    TaskLifecycleChangeset {
        status: task.status().as_str().to_owned(),
        progress: i16::from(task.progress()),
        message: task.message().to_owned(),
        error: task.error().map(str::to_owned),
        started_at: task.started_at(),
        finished_at: task.finished_at(),
        updated_at: task.updated_at(),
    }
}

pub(super) fn to_result_row(
    task: &Task,
    result: &TaskResult,
) -> TaskRepositoryResult<TaskResultRow> {
    let visits = serde_json::to_value(result.visits()).map_err(TaskRepositoryError::persistence)?;
    let total = i32::try_from(result.len()).map_err(TaskRepositoryError::persistence)?;
    Ok(TaskResultRow {
        task_id: task.id().into_inner(),
        visits,
        total,
        created_at: task.updated_at(),
    })
}

pub(super) fn row_to_task(row: TaskRow) -> TaskRepositoryResult<Task> {
    let TaskRow {
        id,
        date,
        counter_id,
        token,
        status: persisted_status,
        progress: persisted_progress,
        message,
        error,
        created_at,
        started_at,
        finished_at,
        updated_at,
    } = row;

    let counter = CounterId::new(counter_id).map_err(TaskRepositoryError::persistence)?;
    let api_token = ApiToken::new(token).map_err(TaskRepositoryError::persistence)?;
    let status = TaskStatus::try_from(persisted_status.as_str())
        .map_err(TaskRepositoryError::persistence)?;
    let progress = u8::try_from(persisted_progress).map_err(TaskRepositoryError::persistence)?;

    Ok(Task::from_persisted(PersistedTaskData {
        id: TaskId::from_uuid(id),
        params: TaskParams::from_parts(date, counter, api_token),
        status,
        progress,
        message,
        error,
        created_at,
        started_at,
        finished_at,
        updated_at,
    }))
}

pub(super) fn row_to_result(row: TaskResultRow) -> TaskRepositoryResult<TaskResult> {
    let visits = serde_json::from_value::<Vec<ScoredVisit>>(row.visits)
        .map_err(TaskRepositoryError::persistence)?;
    Ok(TaskResult::new(TaskId::from_uuid(row.task_id), visits))
}
