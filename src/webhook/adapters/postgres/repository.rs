//! `PostgreSQL` repository implementations for webhooks and batches.
//!
//! Conversion updates lock the owning batch row with `SELECT ... FOR UPDATE`
//! and recompute its aggregate in the same transaction, so concurrent
//! dispatch of sibling conversions never leaves stale totals behind.

use super::{
    models::{
        BatchAggregateChangeset, BatchRow, ConversionRow, ConversionStatusChangeset,
        WebhookActivationChangeset, WebhookRow,
    },
    schema::{webhook_batches, webhook_conversions, webhooks},
};
use crate::conversion::domain::{ConversionEvent, ConversionIdentity};
use crate::counter::{ApiToken, CounterId};
use crate::persistence::{PgPool, get_conn_with, run_blocking_with};
use crate::webhook::{
    domain::{
        BatchId, BatchStatus, ConversionStatus, PersistedBatchData, PersistedConversionData,
        PersistedWebhookData, SecretDigest, Webhook, WebhookBatch, WebhookConversion,
        WebhookConversionId, WebhookId,
    },
    ports::{
        BatchRepository, ConversionUpdate, WebhookRegistry, WebhookRepositoryError,
        WebhookRepositoryResult,
    },
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

async fn run_on_pool<F, T>(pool: &PgPool, f: F) -> WebhookRepositoryResult<T>
where
    F: FnOnce(&mut PgConnection) -> WebhookRepositoryResult<T> + Send + 'static,
    T: Send + 'static,
{
    let owned_pool = pool.clone();
    run_blocking_with(
        move || {
            let mut connection = get_conn_with(&owned_pool, WebhookRepositoryError::persistence)?;
            f(&mut connection)
        },
        WebhookRepositoryError::persistence,
    )
    .await
}

/// `PostgreSQL`-backed webhook registry.
#[derive(Debug, Clone)]
pub struct PostgresWebhookRegistry {
    pool: PgPool,
}

impl PostgresWebhookRegistry {
    /// Creates a new registry from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WebhookRegistry for PostgresWebhookRegistry {
    async fn store(&self, webhook: &Webhook) -> WebhookRepositoryResult<()> {
        let webhook_id = webhook.id();
        let row = webhook_to_row(webhook);
        run_on_pool(&self.pool, move |connection| {
            diesel::insert_into(webhooks::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        WebhookRepositoryError::DuplicateWebhook(webhook_id)
                    }
                    _ => WebhookRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn update(&self, webhook: &Webhook) -> WebhookRepositoryResult<()> {
        let webhook_id = webhook.id();
        let changeset = WebhookActivationChangeset {
            is_active: webhook.is_active(),
            updated_at: webhook.updated_at(),
        };
        run_on_pool(&self.pool, move |connection| {
            let updated = diesel::update(webhooks::table.find(webhook_id.into_inner()))
                .set(&changeset)
                .execute(connection)
                .map_err(WebhookRepositoryError::persistence)?;
            if updated == 0 {
                return Err(WebhookRepositoryError::WebhookNotFound(webhook_id));
            }
            Ok(())
        })
        .await
    }

    async fn find_by_id(&self, id: WebhookId) -> WebhookRepositoryResult<Option<Webhook>> {
        run_on_pool(&self.pool, move |connection| {
            let row = webhooks::table
                .find(id.into_inner())
                .select(WebhookRow::as_select())
                .first::<WebhookRow>(connection)
                .optional()
                .map_err(WebhookRepositoryError::persistence)?;
            row.map(row_to_webhook).transpose()
        })
        .await
    }
}

/// `PostgreSQL`-backed batch repository.
#[derive(Debug, Clone)]
pub struct PostgresBatchRepository {
    pool: PgPool,
}

impl PostgresBatchRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

enum TxError {
    Diesel(DieselError),
    Repository(WebhookRepositoryError),
}

impl From<DieselError> for TxError {
    fn from(err: DieselError) -> Self {
        Self::Diesel(err)
    }
}

impl From<WebhookRepositoryError> for TxError {
    fn from(err: WebhookRepositoryError) -> Self {
        Self::Repository(err)
    }
}

impl From<TxError> for WebhookRepositoryError {
    fn from(err: TxError) -> Self {
        match err {
            TxError::Diesel(inner) => Self::persistence(inner),
            TxError::Repository(inner) => inner,
        }
    }
}

#[async_trait]
impl BatchRepository for PostgresBatchRepository {
    async fn store_batch(
        &self,
        batch: &WebhookBatch,
        conversions: &[WebhookConversion],
    ) -> WebhookRepositoryResult<()> {
        let batch_id = batch.id();
        let batch_row = batch_to_row(batch)?;
        let conversion_rows = conversions
            .iter()
            .enumerate()
            .map(|(position, conversion)| conversion_to_row(position, conversion))
            .collect::<WebhookRepositoryResult<Vec<_>>>()?;
        run_on_pool(&self.pool, move |connection| {
            connection
                .transaction::<_, DieselError, _>(|tx| {
                    diesel::insert_into(webhook_batches::table)
                        .values(&batch_row)
                        .execute(tx)?;
                    diesel::insert_into(webhook_conversions::table)
                        .values(&conversion_rows)
                        .execute(tx)?;
                    Ok(())
                })
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        WebhookRepositoryError::DuplicateBatch(batch_id)
                    }
                    _ => WebhookRepositoryError::persistence(err),
                })
        })
        .await
    }

    async fn update_conversion(
        &self,
        update: ConversionUpdate,
    ) -> WebhookRepositoryResult<WebhookBatch> {
        run_on_pool(&self.pool, move |connection| {
            connection
                .transaction::<_, TxError, _>(|tx| apply_conversion_update(tx, &update))
                .map_err(WebhookRepositoryError::from)
        })
        .await
    }

    async fn find_batch(&self, id: BatchId) -> WebhookRepositoryResult<Option<WebhookBatch>> {
        run_on_pool(&self.pool, move |connection| {
            let row = webhook_batches::table
                .find(id.into_inner())
                .select(BatchRow::as_select())
                .first::<BatchRow>(connection)
                .optional()
                .map_err(WebhookRepositoryError::persistence)?;
            row.map(row_to_batch).transpose()
        })
        .await
    }

    async fn list_conversions(
        &self,
        batch_id: BatchId,
    ) -> WebhookRepositoryResult<Vec<WebhookConversion>> {
        run_on_pool(&self.pool, move |connection| {
            load_conversions(connection, batch_id).map_err(WebhookRepositoryError::from)
        })
        .await
    }
}

fn apply_conversion_update(
    tx: &mut PgConnection,
    update: &ConversionUpdate,
) -> Result<WebhookBatch, TxError> {
    let conversion = &update.conversion;
    let batch_id = conversion.batch_id();
    let locked = webhook_batches::table
        .find(batch_id.into_inner())
        .select(BatchRow::as_select())
        .for_update()
        .first::<BatchRow>(tx)
        .optional()?
        .ok_or(WebhookRepositoryError::BatchNotFound(batch_id))?;

    let changeset = ConversionStatusChangeset {
        status: conversion.status().as_str().to_owned(),
        error: conversion.error().map(str::to_owned),
        updated_at: conversion.updated_at(),
    };
    let updated = diesel::update(
        webhook_conversions::table
            .filter(webhook_conversions::id.eq(conversion.id().into_inner()))
            .filter(webhook_conversions::batch_id.eq(batch_id.into_inner())),
    )
    .set(&changeset)
    .execute(tx)?;
    if updated == 0 {
        return Err(WebhookRepositoryError::ConversionNotFound(conversion.id()).into());
    }

    let children = load_conversions(tx, batch_id)?;
    let mut batch = row_to_batch(locked)?;
    if let Some(reference) = update.upload_reference {
        batch.record_upload_reference(reference);
    }
    batch.recompute(&children, update.observed_at);

    diesel::update(webhook_batches::table.find(batch_id.into_inner()))
        .set(&aggregate_changeset(&batch)?)
        .execute(tx)?;
    Ok(batch)
}

fn load_conversions(
    connection: &mut PgConnection,
    batch_id: BatchId,
) -> Result<Vec<WebhookConversion>, TxError> {
    let rows = webhook_conversions::table
        .filter(webhook_conversions::batch_id.eq(batch_id.into_inner()))
        .order(webhook_conversions::position.asc())
        .select(ConversionRow::as_select())
        .load::<ConversionRow>(connection)?;
    Ok(rows
        .into_iter()
        .map(row_to_conversion)
        .collect::<WebhookRepositoryResult<Vec<_>>>()?)
}

fn count_to_db(value: u32) -> WebhookRepositoryResult<i32> {
    i32::try_from(value).map_err(WebhookRepositoryError::persistence)
}

fn count_from_db(value: i32) -> WebhookRepositoryResult<u32> {
    u32::try_from(value).map_err(WebhookRepositoryError::persistence)
}

fn errors_to_json(errors: Option<&[String]>) -> WebhookRepositoryResult<Option<serde_json::Value>> {
    errors
        .map(serde_json::to_value)
        .transpose()
        .map_err(WebhookRepositoryError::persistence)
}

fn upload_id_to_db(batch: &WebhookBatch) -> WebhookRepositoryResult<Option<i64>> {
    batch
        .metrika_upload_id()
        .map(i64::try_from)
        .transpose()
        .map_err(WebhookRepositoryError::persistence)
}

pub(super) fn webhook_to_row(webhook: &Webhook) -> WebhookRow {
    WebhookRow {
        id: webhook.id().into_inner(),
        name: webhook.name().to_owned(),
        description: webhook.description().map(str::to_owned),
        counter_id: webhook.counter().as_i64(),
        token: webhook.token().expose().to_owned(),
        secret_digest: webhook.secret_digest().as_bytes().to_vec(),
        is_active: webhook.is_active(),
        created_at: webhook.created_at(),
        updated_at: webhook.updated_at(),
    }
}

pub(super) fn row_to_webhook(row: WebhookRow) -> WebhookRepositoryResult<Webhook> {
    Ok(Webhook::from_persisted(PersistedWebhookData {
        id: WebhookId::from_uuid(row.id),
        name: row.name,
        description: row.description,
        counter: CounterId::new(row.counter_id).map_err(WebhookRepositoryError::persistence)?,
        token: ApiToken::new(row.token).map_err(WebhookRepositoryError::persistence)?,
        secret_digest: SecretDigest::from_bytes(row.secret_digest),
        is_active: row.is_active,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}

pub(super) fn batch_to_row(batch: &WebhookBatch) -> WebhookRepositoryResult<BatchRow> {
    Ok(BatchRow {
        id: batch.id().into_inner(),
        webhook_id: batch.webhook_id().into_inner(),
        counter_id: batch.counter().as_i64(),
        status: batch.status().as_str().to_owned(),
        total: count_to_db(batch.total())?,
        processed: count_to_db(batch.processed())?,
        metrika_upload_id: upload_id_to_db(batch)?,
        errors: errors_to_json(batch.errors())?,
        created_at: batch.created_at(),
        updated_at: batch.updated_at(),
    })
}

fn aggregate_changeset(batch: &WebhookBatch) -> WebhookRepositoryResult<BatchAggregateChangeset> {
    Ok(BatchAggregateChangeset {
        status: batch.status().as_str().to_owned(),
        total: count_to_db(batch.total())?,
        processed: count_to_db(batch.processed())?,
        metrika_upload_id: upload_id_to_db(batch)?,
        errors: errors_to_json(batch.errors())?,
        updated_at: batch.updated_at(),
    })
}

pub(super) fn row_to_batch(row: BatchRow) -> WebhookRepositoryResult<WebhookBatch> {
    let BatchRow {
        id,
        webhook_id,
        counter_id,
        status: persisted_status,
        total,
        processed,
        metrika_upload_id,
        errors,
        created_at,
        updated_at,
    } = row;

    Ok(WebhookBatch::from_persisted(PersistedBatchData {
        id: BatchId::from_uuid(id),
        webhook_id: WebhookId::from_uuid(webhook_id),
        counter: CounterId::new(counter_id).map_err(WebhookRepositoryError::persistence)?,
        status: BatchStatus::try_from(persisted_status.as_str())
            .map_err(WebhookRepositoryError::persistence)?,
        total: count_from_db(total)?,
        processed: count_from_db(processed)?,
        metrika_upload_id: metrika_upload_id
            .map(u64::try_from)
            .transpose()
            .map_err(WebhookRepositoryError::persistence)?,
        errors: errors
            .map(serde_json::from_value::<Vec<String>>)
            .transpose()
            .map_err(WebhookRepositoryError::persistence)?,
        created_at,
        updated_at,
    }))
}

pub(super) fn conversion_to_row(
    position: usize,
    conversion: &WebhookConversion,
) -> WebhookRepositoryResult<ConversionRow> {
    let event = conversion.event();
    let identity = event.identity();
    Ok(ConversionRow {
        id: conversion.id().into_inner(),
        batch_id: conversion.batch_id().into_inner(),
        position: i32::try_from(position).map_err(WebhookRepositoryError::persistence)?,
        client_id: identity.client_id.clone(),
        user_id: identity.user_id.clone(),
        yclid: identity.yclid.clone(),
        purchase_id: identity.purchase_id.clone(),
        target: event.target().to_owned(),
        date_time: event.date_time(),
        price: event.price(),
        currency: event.currency().map(|currency| currency.as_str().to_owned()),
        status: conversion.status().as_str().to_owned(),
        error: conversion.error().map(str::to_owned),
        created_at: conversion.created_at(),
        updated_at: conversion.updated_at(),
    })
}

pub(super) fn row_to_conversion(row: ConversionRow) -> WebhookRepositoryResult<WebhookConversion> {
    let ConversionRow {
        id,
        batch_id,
        position: _,
        client_id,
        user_id,
        yclid,
        purchase_id,
        target,
        date_time,
        price,
        currency,
        status: persisted_status,
        error,
        created_at,
        updated_at,
    } = row;

    let event = ConversionEvent::new(
        ConversionIdentity {
            client_id,
            user_id,
            yclid,
            purchase_id,
        },
        &target,
        date_time,
        price,
        currency.as_deref(),
    )
    .map_err(WebhookRepositoryError::persistence)?;

    Ok(WebhookConversion::from_persisted(PersistedConversionData {
        id: WebhookConversionId::from_uuid(id),
        batch_id: BatchId::from_uuid(batch_id),
        event,
        status: ConversionStatus::try_from(persisted_status.as_str())
            .map_err(WebhookRepositoryError::persistence)?,
        error,
        created_at,
        updated_at,
    }))
}
