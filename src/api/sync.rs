//! HubSpot sync queue and conflict endpoints

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::auth::Claims;
use crate::domain::{DomainError, Permission};
use crate::infrastructure::AppState;
use crate::services::negocio_service;
use crate::sync::conflict::{self, Resolution};
use crate::sync::queue::{self, QueueFilter, QueueStats, RetryReport, SyncStatus};
use crate::sync::{ItemOutcome, process_next_item, processor};

#[derive(Debug, Deserialize)]
pub struct QueueQuery {
    pub status: Option<SyncStatus>,
    pub negocio_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ConflictsQuery {
    pub negocio_id: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResolveConflictRequest {
    pub resolution: Resolution,
}

pub async fn list_queue(
    State(state): State<AppState>,
    claims: Claims,
    Query(params): Query<QueueQuery>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::ViewBusinesses)?;
    let filter = QueueFilter {
        status: params.status,
        negocio_id: params.negocio_id,
    };
    let items = queue::list_items(state.db(), filter).await?;
    Ok(Json(json!({ "items": items, "total": items.len() })))
}

#[utoipa::path(
    get,
    path = "/api/sync/stats",
    tag = "sync",
    responses((status = 200, description = "Queue counts per status", body = QueueStats)),
    security(("bearer" = []))
)]
pub async fn queue_stats(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<QueueStats>, DomainError> {
    claims.require(Permission::ViewBusinesses)?;
    Ok(Json(queue::queue_stats(state.db()).await?))
}

/// On-demand retry; failed items are never retried automatically.
#[utoipa::path(
    post,
    path = "/api/sync/retry",
    tag = "sync",
    responses(
        (status = 200, description = "Failed items moved back to pending", body = RetryReport)
    ),
    security(("bearer" = []))
)]
pub async fn retry_failed(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<RetryReport>, DomainError> {
    claims.require(Permission::ManageHubspot)?;
    Ok(Json(queue::retry_failed(state.db()).await?))
}

pub async fn purge_finished(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::RunMaintenance)?;
    let deleted = queue::purge_finished(state.db()).await?;
    Ok(Json(json!({ "deleted": deleted })))
}

/// Run one queue item now instead of waiting for the background processor.
pub async fn process_next(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::ManageHubspot)?;

    let body = match process_next_item(state.db(), state.crm.as_ref()).await? {
        None => json!({ "processed": false }),
        Some(ItemOutcome::Completed) => json!({ "processed": true, "outcome": "completed" }),
        Some(ItemOutcome::Skipped(reason)) => {
            json!({ "processed": true, "outcome": "skipped", "reason": reason })
        }
        Some(ItemOutcome::Failed(error)) => {
            json!({ "processed": true, "outcome": "failed", "error": error })
        }
        Some(ItemOutcome::Conflict(id)) => {
            json!({ "processed": true, "outcome": "conflict", "conflict_id": id })
        }
    };
    Ok(Json(body))
}

pub async fn schedule_pulls(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::ManageHubspot)?;
    let scheduled = processor::schedule_pulls(state.db()).await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "scheduled": scheduled }))))
}

pub async fn pull_negocio(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::ManageHubspot)?;
    let negocio = negocio_service::find_negocio(state.db(), id).await?;
    if negocio.hubspot_deal_id.as_deref().is_none_or(str::is_empty) {
        return Err(DomainError::validation(format!(
            "Negocio {} is not linked to a HubSpot deal",
            id
        )));
    }
    let item = queue::enqueue_pull_stage(state.db(), id).await?;
    Ok((StatusCode::ACCEPTED, Json(item)))
}

pub async fn list_conflicts(
    State(state): State<AppState>,
    claims: Claims,
    Query(params): Query<ConflictsQuery>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::ViewBusinesses)?;
    let conflicts = conflict::list_conflicts(state.db(), params.negocio_id).await?;
    Ok(Json(json!({ "conflicts": conflicts, "total": conflicts.len() })))
}

#[utoipa::path(
    post,
    path = "/api/sync/conflicts/{id}/resolve",
    tag = "sync",
    params(("id" = i32, Path, description = "Conflict id")),
    request_body = ResolveConflictRequest,
    responses(
        (status = 200, description = "Conflict resolved"),
        (status = 400, description = "Resolution not allowed"),
        (status = 404, description = "Conflict not found"),
        (status = 409, description = "Conflict already resolved")
    ),
    security(("bearer" = []))
)]
pub async fn resolve_conflict(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(payload): Json<ResolveConflictRequest>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::EditBusinesses)?;
    Ok(Json(
        conflict::resolve_conflict(state.db(), id, payload.resolution).await?,
    ))
}
