//! HubSpot settings per user: the private app key and the stage mapping
//!
//! Keys are written here and read back only as a masked status. The raw
//! key leaves this module wrapped in a [`SecretString`].
#![allow(clippy::needless_update)] // SeaORM ActiveModels require ..Default::default()

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;
use utoipa::ToSchema;

use super::now_timestamp;
use crate::domain::{DomainError, EstadoNegocio};
use crate::models::{hubspot_api_key, hubspot_stage_mapping};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HubspotKeyStatus {
    pub configured: bool,
    pub activo: bool,
    /// Last four characters only, e.g. `****a1b2`
    pub masked_key: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SaveApiKeyInput {
    pub api_key: String,
    #[serde(default = "default_true")]
    pub activo: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StageMappingInput {
    pub estado_negocio: EstadoNegocio,
    pub hubspot_stage_id: String,
    pub hubspot_pipeline_id: Option<String>,
}

pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

async fn find_key<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
) -> Result<Option<hubspot_api_key::Model>, DomainError> {
    Ok(hubspot_api_key::Entity::find()
        .filter(hubspot_api_key::Column::UserId.eq(user_id))
        .one(db)
        .await?)
}

pub async fn key_status<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
) -> Result<HubspotKeyStatus, DomainError> {
    Ok(match find_key(db, user_id).await? {
        Some(key) => HubspotKeyStatus {
            configured: true,
            activo: key.activo,
            masked_key: Some(mask_key(&key.api_key)),
            updated_at: Some(key.updated_at),
        },
        None => HubspotKeyStatus {
            configured: false,
            activo: false,
            masked_key: None,
            updated_at: None,
        },
    })
}

pub async fn save_api_key<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    input: SaveApiKeyInput,
) -> Result<HubspotKeyStatus, DomainError> {
    let key = input.api_key.trim().to_string();
    if key.is_empty() {
        return Err(DomainError::validation("api_key is required"));
    }

    let now = now_timestamp();
    match find_key(db, user_id).await? {
        Some(existing) => {
            let mut active: hubspot_api_key::ActiveModel = existing.into();
            active.api_key = Set(key);
            active.activo = Set(input.activo);
            active.updated_at = Set(now);
            active.update(db).await?;
        }
        None => {
            hubspot_api_key::ActiveModel {
                user_id: Set(user_id),
                api_key: Set(key),
                activo: Set(input.activo),
                created_at: Set(now.clone()),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
    }

    tracing::info!("HubSpot API key saved for user {}", user_id);
    key_status(db, user_id).await
}

pub async fn delete_api_key<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<(), DomainError> {
    let result = hubspot_api_key::Entity::delete_many()
        .filter(hubspot_api_key::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(DomainError::not_found("HubSpot API key"));
    }
    Ok(())
}

/// The user's key, only when it is marked active.
pub async fn active_api_key<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
) -> Result<Option<SecretString>, DomainError> {
    Ok(find_key(db, user_id)
        .await?
        .filter(|k| k.activo)
        .map(|k| SecretString::new(k.api_key)))
}

pub async fn list_stage_mappings<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
) -> Result<Vec<hubspot_stage_mapping::Model>, DomainError> {
    Ok(hubspot_stage_mapping::Entity::find()
        .filter(hubspot_stage_mapping::Column::UserId.eq(user_id))
        .order_by_asc(hubspot_stage_mapping::Column::Id)
        .all(db)
        .await?)
}

/// Replace the user's whole mapping.
pub async fn save_stage_mappings<C>(
    db: &C,
    user_id: i32,
    mappings: Vec<StageMappingInput>,
) -> Result<Vec<hubspot_stage_mapping::Model>, DomainError>
where
    C: ConnectionTrait + TransactionTrait,
{
    let mut seen = HashSet::new();
    for m in &mappings {
        if m.hubspot_stage_id.trim().is_empty() {
            return Err(DomainError::validation(format!(
                "hubspot_stage_id is required for {}",
                m.estado_negocio
            )));
        }
        if !seen.insert(m.estado_negocio) {
            return Err(DomainError::validation(format!(
                "{} is mapped more than once",
                m.estado_negocio
            )));
        }
    }

    let txn = db.begin().await?;

    hubspot_stage_mapping::Entity::delete_many()
        .filter(hubspot_stage_mapping::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?;

    let now = now_timestamp();
    for m in mappings {
        hubspot_stage_mapping::ActiveModel {
            user_id: Set(user_id),
            estado_negocio: Set(m.estado_negocio.to_string()),
            hubspot_stage_id: Set(m.hubspot_stage_id.trim().to_string()),
            hubspot_pipeline_id: Set(super::clean(m.hubspot_pipeline_id)),
            created_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    let saved = list_stage_mappings(&txn, user_id).await?;
    txn.commit().await?;

    tracing::info!("Saved {} HubSpot stage mappings for user {}", saved.len(), user_id);
    Ok(saved)
}

pub async fn stage_for_estado<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    estado: EstadoNegocio,
) -> Result<Option<hubspot_stage_mapping::Model>, DomainError> {
    Ok(hubspot_stage_mapping::Entity::find()
        .filter(hubspot_stage_mapping::Column::UserId.eq(user_id))
        .filter(hubspot_stage_mapping::Column::EstadoNegocio.eq(estado.as_ref()))
        .one(db)
        .await?)
}

/// Reverse lookup, only good for naming the remote side of a conflict.
/// When several states share a stage the first mapped wins.
pub async fn estado_for_stage<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    stage_id: &str,
) -> Result<Option<EstadoNegocio>, DomainError> {
    let mapping = hubspot_stage_mapping::Entity::find()
        .filter(hubspot_stage_mapping::Column::UserId.eq(user_id))
        .filter(hubspot_stage_mapping::Column::HubspotStageId.eq(stage_id))
        .order_by_asc(hubspot_stage_mapping::Column::Id)
        .one(db)
        .await?;

    Ok(mapping.and_then(|m| EstadoNegocio::from_str(&m.estado_negocio).ok()))
}
