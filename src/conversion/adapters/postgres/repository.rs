//! `PostgreSQL` repository implementation for conversion uploads.

use super::{
    models::{UploadChangeset, UploadRow},
    schema::conversion_uploads,
};
use crate::conversion::{
    domain::{ConversionUpload, PersistedUploadData, UploadId, UploadStatus},
    ports::{UploadRepository, UploadRepositoryError, UploadRepositoryResult},
};
use crate::counter::{ApiToken, CounterId};
use crate::persistence::{PgPool, get_conn_with, run_blocking_with};
use crate::task::domain::TaskId;
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL`-backed upload repository.
#[derive(Debug, Clone)]
pub struct PostgresUploadRepository {
    pool: PgPool,
}

impl PostgresUploadRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> UploadRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> UploadRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        run_blocking_with(
            move || {
                let mut connection = get_conn_with(&pool, UploadRepositoryError::persistence)?;
                f(&mut connection)
            },
            UploadRepositoryError::persistence,
        )
        .await
    }
}

#[async_trait]
impl UploadRepository for PostgresUploadRepository {
    async fn store(&self, upload: &ConversionUpload) -> UploadRepositoryResult<()> {
        let upload_id = upload.id();
        let row = to_row(upload)?;
        self.run_blocking(move |connection| {
            diesel::insert_into(conversion_uploads::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        UploadRepositoryError::DuplicateUpload(upload_id)
                    }
                    _ => UploadRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn update(&self, upload: &ConversionUpload) -> UploadRepositoryResult<()> {
        let upload_id = upload.id();
        let changeset = to_changeset(upload)?;
        self.run_blocking(move |connection| {
            let updated = diesel::update(conversion_uploads::table.find(upload_id.into_inner()))
                .set(&changeset)
                .execute(connection)
                .map_err(UploadRepositoryError::persistence)?;
            if updated == 0 {
                return Err(UploadRepositoryError::NotFound(upload_id));
            }
            Ok(())
        })
        .await
    }

    async fn find_by_id(&self, id: UploadId) -> UploadRepositoryResult<Option<ConversionUpload>> {
        self.run_blocking(move |connection| {
            let row = conversion_uploads::table
                .find(id.into_inner())
                .select(UploadRow::as_select())
                .first::<UploadRow>(connection)
                .optional()
                .map_err(UploadRepositoryError::persistence)?;
            row.map(row_to_upload).transpose()
        })
        .await
    }

    async fn list_for_task(&self, task_id: TaskId) -> UploadRepositoryResult<Vec<ConversionUpload>> {
        self.run_blocking(move |connection| {
            let rows = conversion_uploads::table
                .filter(conversion_uploads::task_id.eq(task_id.into_inner()))
                .order((conversion_uploads::created_at.asc(), conversion_uploads::id.asc()))
                .select(UploadRow::as_select())
                .load::<UploadRow>(connection)
                .map_err(UploadRepositoryError::persistence)?;
            rows.into_iter().map(row_to_upload).collect()
        })
        .await
    }
}

fn errors_to_json(upload: &ConversionUpload) -> UploadRepositoryResult<Option<serde_json::Value>> {
    upload
        .errors()
        .map(serde_json::to_value)
        .transpose()
        .map_err(UploadRepositoryError::persistence)
}

fn external_id_to_db(upload: &ConversionUpload) -> UploadRepositoryResult<Option<i64>> {
    upload
        .external_id()
        .map(i64::try_from)
        .transpose()
        .map_err(UploadRepositoryError::persistence)
}

fn count_to_db(value: u32) -> UploadRepositoryResult<i32> {
    i32::try_from(value).map_err(UploadRepositoryError::persistence)
}

pub(super) fn to_row(upload: &ConversionUpload) -> UploadRepositoryResult<UploadRow> {
    Ok(UploadRow {
        id: upload.id().into_inner(),
        task_id: upload.task_id().map(TaskId::into_inner),
        counter_id: upload.counter().as_i64(),
        target: upload.target().to_owned(),
        token: upload.token().expose().to_owned(),
        status: upload.status().as_str().to_owned(),
        total: count_to_db(upload.total())?,
        processed: count_to_db(upload.processed())?,
        errors: errors_to_json(upload)?,
        external_id: external_id_to_db(upload)?,
        created_at: upload.created_at(),
        updated_at: upload.updated_at(),
    })
}

fn to_changeset(upload: &ConversionUpload) -> UploadRepositoryResult<UploadChangeset> {
    Ok(UploadChangeset {
        status: upload.status().as_str().to_owned(),
        processed: count_to_db(upload.processed())?,
        errors: errors_to_json(upload)?,
        external_id: external_id_to_db(upload)?,
        updated_at: upload.updated_at(),
    })
}

pub(super) fn row_to_upload(row: UploadRow) -> UploadRepositoryResult<ConversionUpload> {
    let UploadRow {
        id,
        task_id,
        counter_id,
        target,
        token,
        status: persisted_status,
        total,
        processed,
        errors,
        external_id,
        created_at,
        updated_at,
    } = row;

    Ok(ConversionUpload::from_persisted(PersistedUploadData {
        id: UploadId::from_uuid(id),
        task_id: task_id.map(TaskId::from_uuid),
        counter: CounterId::new(counter_id).map_err(UploadRepositoryError::persistence)?,
        target,
        token: ApiToken::new(token).map_err(UploadRepositoryError::persistence)?,
        status: UploadStatus::try_from(persisted_status.as_str())
            .map_err(UploadRepositoryError::persistence)?,
        total: u32::try_from(total).map_err(UploadRepositoryError::persistence)?,
        processed: u32::try_from(processed).map_err(UploadRepositoryError::persistence)?,
        errors: errors
            .map(serde_json::from_value::<Vec<String>>)
            .transpose()
            .map_err(UploadRepositoryError::persistence)?,
        external_id: external_id
            .map(u64::try_from)
            .transpose()
            .map_err(UploadRepositoryError::persistence)?,
        created_at,
        updated_at,
    }))
}
