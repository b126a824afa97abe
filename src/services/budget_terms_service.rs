use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set};
use serde::Deserialize;
use utoipa::ToSchema;

use super::{clean, now_timestamp};
use crate::domain::DomainError;
use crate::models::budget_terms_config;

const TERMS_ID: i32 = 1;

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateBudgetTermsInput {
    pub condiciones_pago: Option<String>,
    pub validez_dias: Option<i32>,
    pub notas: Option<String>,
}

/// The single terms row. Migrations seed it, so a missing row is a broken store.
pub async fn get_terms<C: ConnectionTrait>(
    db: &C,
) -> Result<budget_terms_config::Model, DomainError> {
    budget_terms_config::Entity::find_by_id(TERMS_ID)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::Internal("budget terms row is missing".to_string()))
}

pub async fn update_terms<C: ConnectionTrait>(
    db: &C,
    input: UpdateBudgetTermsInput,
) -> Result<budget_terms_config::Model, DomainError> {
    let mut active: budget_terms_config::ActiveModel = get_terms(db).await?.into();

    if let Some(condiciones) = input.condiciones_pago {
        let condiciones = condiciones.trim().to_string();
        if condiciones.is_empty() {
            return Err(DomainError::validation("condiciones_pago cannot be empty"));
        }
        active.condiciones_pago = Set(condiciones);
    }
    if let Some(dias) = input.validez_dias {
        if !(1..=365).contains(&dias) {
            return Err(DomainError::validation("validez_dias must be between 1 and 365"));
        }
        active.validez_dias = Set(dias);
    }
    if input.notas.is_some() {
        active.notas = Set(clean(input.notas));
    }

    active.updated_at = Set(now_timestamp());
    let terms = active.update(db).await?;
    tracing::info!("Budget terms updated (validez {} dias)", terms.validez_dias);
    Ok(terms)
}
