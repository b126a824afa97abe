//! HubSpot sync queue
//!
//! Rows in `sync_queue` drive the background processor and the UI's
//! "retry failed" action. This is not a guaranteed-delivery log: failed
//! items stay failed until a user retries them.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::domain::{DomainError, EstadoNegocio};
use crate::models::sync_queue;
use crate::services::now_timestamp;

pub const DEFAULT_MAX_ATTEMPTS: i32 = 5;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SyncOperation {
    /// Push the local business state to the HubSpot deal stage
    UpdateStage,
    /// Read the deal stage back and compare with the local state
    PullStage,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SyncStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical = 0,
    High = 1,
    Normal = 2,
    Low = 3,
}

impl From<i32> for Priority {
    fn from(value: i32) -> Self {
        match value {
            i32::MIN..=0 => Priority::Critical,
            1 => Priority::High,
            2 => Priority::Normal,
            _ => Priority::Low,
        }
    }
}

impl Priority {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct QueueStats {
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
    pub skipped: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RetryReport {
    /// Items moved back to pending
    pub requeued: u64,
    /// Failed items left alone because they used up their attempts
    pub exhausted: u64,
}

pub fn operation_of(item: &sync_queue::Model) -> Option<SyncOperation> {
    SyncOperation::from_str(&item.operacion).ok()
}

async fn pending_item<C: ConnectionTrait>(
    db: &C,
    negocio_id: i32,
    operation: SyncOperation,
) -> Result<Option<sync_queue::Model>, DomainError> {
    Ok(sync_queue::Entity::find()
        .filter(sync_queue::Column::NegocioId.eq(negocio_id))
        .filter(sync_queue::Column::Operacion.eq(operation.as_ref()))
        .filter(sync_queue::Column::Estado.eq(SyncStatus::Pending.as_ref()))
        .one(db)
        .await?)
}

/// Add an item, coalescing with a pending item of the same operation for
/// the same negocio. The surviving item keeps the higher priority.
pub async fn enqueue<C: ConnectionTrait>(
    db: &C,
    negocio_id: i32,
    operation: SyncOperation,
    priority: Priority,
    payload: Option<serde_json::Value>,
) -> Result<sync_queue::Model, DomainError> {
    let now = now_timestamp();

    if let Some(existing) = pending_item(db, negocio_id, operation).await? {
        let merged = Priority::from(existing.prioridad).min(priority);
        let mut active: sync_queue::ActiveModel = existing.into();
        active.prioridad = Set(merged.as_i32());
        if payload.is_some() {
            active.payload = Set(payload.map(|p| p.to_string()));
        }
        active.updated_at = Set(now);
        let item = active.update(db).await?;
        tracing::debug!("Coalesced {} for negocio {} into {}", operation, negocio_id, item.id);
        return Ok(item);
    }

    let item = sync_queue::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        negocio_id: Set(negocio_id),
        operacion: Set(operation.to_string()),
        prioridad: Set(priority.as_i32()),
        estado: Set(SyncStatus::Pending.to_string()),
        payload: Set(payload.map(|p| p.to_string())),
        intentos: Set(0),
        max_intentos: Set(DEFAULT_MAX_ATTEMPTS),
        error_message: Set(None),
        created_at: Set(now.clone()),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    tracing::info!("Enqueued {} for negocio {} ({:?})", operation, negocio_id, priority);
    Ok(item)
}

pub async fn enqueue_update_stage<C: ConnectionTrait>(
    db: &C,
    negocio_id: i32,
    estado: EstadoNegocio,
    priority: Priority,
) -> Result<sync_queue::Model, DomainError> {
    enqueue(
        db,
        negocio_id,
        SyncOperation::UpdateStage,
        priority,
        Some(json!({ "estado": estado })),
    )
    .await
}

pub async fn enqueue_pull_stage<C: ConnectionTrait>(
    db: &C,
    negocio_id: i32,
) -> Result<sync_queue::Model, DomainError> {
    enqueue(db, negocio_id, SyncOperation::PullStage, Priority::Normal, None).await
}

/// Whether a local change for this negocio is still waiting to be pushed.
pub async fn has_pending_push<C: ConnectionTrait>(
    db: &C,
    negocio_id: i32,
) -> Result<bool, DomainError> {
    Ok(pending_item(db, negocio_id, SyncOperation::UpdateStage)
        .await?
        .is_some())
}

/// Highest priority first, oldest first within a priority.
pub async fn next_pending<C: ConnectionTrait>(
    db: &C,
) -> Result<Option<sync_queue::Model>, DomainError> {
    Ok(sync_queue::Entity::find()
        .filter(sync_queue::Column::Estado.eq(SyncStatus::Pending.as_ref()))
        .order_by_asc(sync_queue::Column::Prioridad)
        .order_by_asc(sync_queue::Column::CreatedAt)
        .one(db)
        .await?)
}

/// Move a pending item to `processing` and count the attempt.
///
/// The update only matches while the row is still pending, so when two
/// workers race for the same item exactly one of them gets `Some`.
pub async fn claim<C: ConnectionTrait>(
    db: &C,
    item: sync_queue::Model,
) -> Result<Option<sync_queue::Model>, DomainError> {
    let result = sync_queue::Entity::update_many()
        .col_expr(
            sync_queue::Column::Estado,
            Expr::value(SyncStatus::Processing.to_string()),
        )
        .col_expr(
            sync_queue::Column::Intentos,
            Expr::col(sync_queue::Column::Intentos).add(1),
        )
        .col_expr(sync_queue::Column::UpdatedAt, Expr::value(now_timestamp()))
        .filter(sync_queue::Column::Id.eq(item.id.as_str()))
        .filter(sync_queue::Column::Estado.eq(SyncStatus::Pending.as_ref()))
        .exec(db)
        .await?;

    if result.rows_affected != 1 {
        return Ok(None);
    }
    Ok(sync_queue::Entity::find_by_id(item.id).one(db).await?)
}

pub async fn finish<C: ConnectionTrait>(
    db: &C,
    item: sync_queue::Model,
    status: SyncStatus,
    message: Option<String>,
) -> Result<sync_queue::Model, DomainError> {
    let mut active: sync_queue::ActiveModel = item.into();
    active.estado = Set(status.to_string());
    active.error_message = Set(message);
    active.updated_at = Set(now_timestamp());
    Ok(active.update(db).await?)
}

/// Filter parameters for listing queue items
#[derive(Debug, Default, Clone)]
pub struct QueueFilter {
    pub status: Option<SyncStatus>,
    pub negocio_id: Option<i32>,
}

pub async fn list_items<C: ConnectionTrait>(
    db: &C,
    filter: QueueFilter,
) -> Result<Vec<sync_queue::Model>, DomainError> {
    let mut condition = Condition::all();

    if let Some(status) = filter.status {
        condition = condition.add(sync_queue::Column::Estado.eq(status.as_ref()));
    }

    if let Some(negocio_id) = filter.negocio_id {
        condition = condition.add(sync_queue::Column::NegocioId.eq(negocio_id));
    }

    Ok(sync_queue::Entity::find()
        .filter(condition)
        .order_by_asc(sync_queue::Column::Prioridad)
        .order_by_desc(sync_queue::Column::CreatedAt)
        .all(db)
        .await?)
}

async fn count_status<C: ConnectionTrait>(db: &C, status: SyncStatus) -> Result<u64, DomainError> {
    Ok(sync_queue::Entity::find()
        .filter(sync_queue::Column::Estado.eq(status.as_ref()))
        .count(db)
        .await?)
}

pub async fn queue_stats<C: ConnectionTrait>(db: &C) -> Result<QueueStats, DomainError> {
    Ok(QueueStats {
        pending: count_status(db, SyncStatus::Pending).await?,
        processing: count_status(db, SyncStatus::Processing).await?,
        completed: count_status(db, SyncStatus::Completed).await?,
        failed: count_status(db, SyncStatus::Failed).await?,
        skipped: count_status(db, SyncStatus::Skipped).await?,
    })
}

/// Move failed items that still have attempts left back to pending.
pub async fn retry_failed<C: ConnectionTrait>(db: &C) -> Result<RetryReport, DomainError> {
    let failed = sync_queue::Column::Estado.eq(SyncStatus::Failed.as_ref());

    let result = sync_queue::Entity::update_many()
        .col_expr(
            sync_queue::Column::Estado,
            Expr::value(SyncStatus::Pending.to_string()),
        )
        .col_expr(
            sync_queue::Column::ErrorMessage,
            Expr::value(Option::<String>::None),
        )
        .col_expr(sync_queue::Column::UpdatedAt, Expr::value(now_timestamp()))
        .filter(failed.clone())
        .filter(
            Expr::col(sync_queue::Column::Intentos).lt(Expr::col(sync_queue::Column::MaxIntentos)),
        )
        .exec(db)
        .await?;

    let exhausted = sync_queue::Entity::find().filter(failed).count(db).await?;

    tracing::info!(
        "Requeued {} failed sync items ({} exhausted)",
        result.rows_affected,
        exhausted
    );
    Ok(RetryReport {
        requeued: result.rows_affected,
        exhausted,
    })
}

/// Items left in `processing` by a crash go back to pending on startup.
pub async fn recover_interrupted<C: ConnectionTrait>(db: &C) -> Result<u64, DomainError> {
    let result = sync_queue::Entity::update_many()
        .col_expr(
            sync_queue::Column::Estado,
            Expr::value(SyncStatus::Pending.to_string()),
        )
        .filter(sync_queue::Column::Estado.eq(SyncStatus::Processing.as_ref()))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Delete completed and skipped items.
pub async fn purge_finished<C: ConnectionTrait>(db: &C) -> Result<u64, DomainError> {
    let result = sync_queue::Entity::delete_many()
        .filter(
            sync_queue::Column::Estado
                .is_in([SyncStatus::Completed.as_ref(), SyncStatus::Skipped.as_ref()]),
        )
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Drop every queued item of a negocio (used when the negocio is deleted).
pub async fn discard_for_negocio<C: ConnectionTrait>(
    db: &C,
    negocio_id: i32,
) -> Result<u64, DomainError> {
    let result = sync_queue::Entity::delete_many()
        .filter(sync_queue::Column::NegocioId.eq(negocio_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;

    #[tokio::test]
    async fn pending_pushes_are_coalesced() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");

        let first =
            enqueue_update_stage(&db, 1, EstadoNegocio::PresupuestoEnviado, Priority::Normal)
                .await
                .unwrap();
        let second = enqueue_update_stage(&db, 1, EstadoNegocio::NegocioAceptado, Priority::High)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.prioridad, Priority::High.as_i32());
        assert!(second.payload.unwrap().contains("negocio_aceptado"));

        let items = list_items(&db, QueueFilter::default()).await.unwrap();
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn next_pending_respects_priority() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");

        enqueue_pull_stage(&db, 1).await.unwrap();
        let urgent = enqueue_update_stage(&db, 2, EstadoNegocio::Cancelado, Priority::Critical)
            .await
            .unwrap();

        let next = next_pending(&db).await.unwrap().expect("an item");
        assert_eq!(next.id, urgent.id);
    }

    #[tokio::test]
    async fn retry_only_requeues_items_with_attempts_left() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");

        let a = enqueue_pull_stage(&db, 1).await.unwrap();
        let a = claim(&db, a).await.unwrap().expect("claimed");
        finish(&db, a, SyncStatus::Failed, Some("boom".into())).await.unwrap();

        let b = enqueue_pull_stage(&db, 2).await.unwrap();
        let mut b: sync_queue::ActiveModel = b.into();
        b.intentos = Set(DEFAULT_MAX_ATTEMPTS);
        b.estado = Set(SyncStatus::Failed.to_string());
        b.update(&db).await.unwrap();

        let report = retry_failed(&db).await.unwrap();
        assert_eq!(report.requeued, 1);
        assert_eq!(report.exhausted, 1);

        let stats = queue_stats(&db).await.unwrap();
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.failed, 1);
    }

    #[tokio::test]
    async fn an_item_can_only_be_claimed_once() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");

        enqueue_update_stage(&db, 1, EstadoNegocio::NegocioAceptado, Priority::High)
            .await
            .unwrap();

        // Two workers read the same pending row before either claims it
        let seen_by_a = next_pending(&db).await.unwrap().expect("an item");
        let seen_by_b = next_pending(&db).await.unwrap().expect("an item");
        assert_eq!(seen_by_a.id, seen_by_b.id);

        let claimed = claim(&db, seen_by_a).await.unwrap().expect("first claim wins");
        assert_eq!(claimed.estado, "processing");
        assert_eq!(claimed.intentos, 1);

        assert!(claim(&db, seen_by_b).await.unwrap().is_none());
        assert!(next_pending(&db).await.unwrap().is_none());

        let stats = queue_stats(&db).await.unwrap();
        assert_eq!(stats.processing, 1);
        assert_eq!(stats.pending, 0);
    }
}
