//! Business-state conflicts between the local store and HubSpot
//!
//! A negocio has at most one open conflict. A newer divergence found while
//! one is open overwrites its remote side instead of opening another.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use super::queue::{self, Priority};
use crate::domain::{DomainError, EstadoNegocio};
use crate::models::{negocio, sync_conflict};
use crate::services::{negocio_service, now_timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ConflictStatus {
    Abierto,
    Resuelto,
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
pub enum Resolution {
    /// Push the local state to HubSpot
    KeepLocal,
    /// Take the HubSpot state locally, without pushing it back
    AcceptRemote,
    /// Both sides ended up equal before anyone resolved it
    Converged,
}

/// Open a conflict for a negocio, or refresh the one already open.
pub async fn record_conflict<C: ConnectionTrait>(
    db: &C,
    negocio_id: i32,
    local: EstadoNegocio,
    remote: EstadoNegocio,
    remote_stage: &str,
) -> Result<sync_conflict::Model, DomainError> {
    let now = now_timestamp();

    if let Some(open) = open_conflict_for(db, negocio_id).await? {
        let mut active: sync_conflict::ActiveModel = open.into();
        active.estado_local = Set(local.to_string());
        active.estado_remoto = Set(remote.to_string());
        active.hubspot_stage_remoto = Set(remote_stage.to_string());
        active.detected_at = Set(now);
        let conflict = active.update(db).await?;
        tracing::info!("Refreshed open conflict {} for negocio {}", conflict.id, negocio_id);
        return Ok(conflict);
    }

    let conflict = sync_conflict::ActiveModel {
        negocio_id: Set(negocio_id),
        estado_local: Set(local.to_string()),
        estado_remoto: Set(remote.to_string()),
        hubspot_stage_remoto: Set(remote_stage.to_string()),
        status: Set(ConflictStatus::Abierto.to_string()),
        resolucion: Set(None),
        detected_at: Set(now),
        resolved_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::warn!(
        "Conflict {} on negocio {}: local {} vs HubSpot {}",
        conflict.id,
        negocio_id,
        local,
        remote
    );
    Ok(conflict)
}

pub async fn open_conflict_for<C: ConnectionTrait>(
    db: &C,
    negocio_id: i32,
) -> Result<Option<sync_conflict::Model>, DomainError> {
    Ok(sync_conflict::Entity::find()
        .filter(sync_conflict::Column::NegocioId.eq(negocio_id))
        .filter(sync_conflict::Column::Status.eq(ConflictStatus::Abierto.as_ref()))
        .one(db)
        .await?)
}

pub async fn open_conflicts<C: ConnectionTrait>(
    db: &C,
) -> Result<Vec<sync_conflict::Model>, DomainError> {
    Ok(sync_conflict::Entity::find()
        .filter(sync_conflict::Column::Status.eq(ConflictStatus::Abierto.as_ref()))
        .order_by_desc(sync_conflict::Column::DetectedAt)
        .all(db)
        .await?)
}

pub async fn list_conflicts<C: ConnectionTrait>(
    db: &C,
    negocio_id: Option<i32>,
) -> Result<Vec<sync_conflict::Model>, DomainError> {
    let mut query = sync_conflict::Entity::find();
    if let Some(id) = negocio_id {
        query = query.filter(sync_conflict::Column::NegocioId.eq(id));
    }
    Ok(query
        .order_by_desc(sync_conflict::Column::DetectedAt)
        .all(db)
        .await?)
}

async fn close<C: ConnectionTrait>(
    db: &C,
    conflict: sync_conflict::Model,
    resolution: Resolution,
) -> Result<sync_conflict::Model, DomainError> {
    let mut active: sync_conflict::ActiveModel = conflict.into();
    active.status = Set(ConflictStatus::Resuelto.to_string());
    active.resolucion = Set(Some(resolution.to_string()));
    active.resolved_at = Set(Some(now_timestamp()));
    Ok(active.update(db).await?)
}

/// Close the open conflict of a negocio whose two sides agree again.
pub async fn close_converged<C: ConnectionTrait>(
    db: &C,
    negocio_id: i32,
) -> Result<Option<sync_conflict::Model>, DomainError> {
    match open_conflict_for(db, negocio_id).await? {
        Some(open) => {
            tracing::info!("Conflict {} converged", open.id);
            Ok(Some(close(db, open, Resolution::Converged).await?))
        }
        None => Ok(None),
    }
}

/// Apply a user's decision on an open conflict.
pub async fn resolve_conflict<C>(
    db: &C,
    conflict_id: i32,
    resolution: Resolution,
) -> Result<sync_conflict::Model, DomainError>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;

    let conflict = sync_conflict::Entity::find_by_id(conflict_id)
        .one(&txn)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("Conflict {}", conflict_id)))?;

    if conflict.status != ConflictStatus::Abierto.as_ref() {
        return Err(DomainError::InvalidState(format!(
            "Conflict {} is already resolved",
            conflict_id
        )));
    }

    let negocio = negocio::Entity::find_by_id(conflict.negocio_id)
        .one(&txn)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("Negocio {}", conflict.negocio_id)))?;

    match resolution {
        Resolution::KeepLocal => {
            let local = EstadoNegocio::from_str(&negocio.estado).map_err(|_| {
                DomainError::InvalidState(format!("Unknown estado '{}'", negocio.estado))
            })?;
            queue::enqueue_update_stage(&txn, negocio.id, local, Priority::High).await?;
        }
        Resolution::AcceptRemote => {
            let remote = EstadoNegocio::from_str(&conflict.estado_remoto).map_err(|_| {
                DomainError::InvalidState(format!("Unknown estado '{}'", conflict.estado_remoto))
            })?;
            negocio_service::write_state(&txn, negocio, remote).await?;
        }
        Resolution::Converged => {
            return Err(DomainError::validation(
                "resolution must be keep_local or accept_remote",
            ));
        }
    }

    let resolved = close(&txn, conflict, resolution).await?;
    txn.commit().await?;

    tracing::info!("Conflict {} resolved: {}", resolved.id, resolution);
    Ok(resolved)
}
