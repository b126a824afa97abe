//! Brand configuration and quote terms (single-row settings)

use axum::{Json, extract::State, response::IntoResponse};
use sea_orm::DatabaseConnection;

use crate::auth::Claims;
use crate::domain::{DomainError, Permission};
use crate::services::brand_service::{self, UpdateBrandInput};
use crate::services::budget_terms_service::{self, UpdateBudgetTermsInput};

pub async fn get_brand(
    State(db): State<DatabaseConnection>,
    _claims: Claims,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(brand_service::get_brand(&db).await?))
}

pub async fn update_brand(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Json(payload): Json<UpdateBrandInput>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::ManageBrand)?;
    Ok(Json(brand_service::update_brand(&db, payload).await?))
}

pub async fn get_terms(
    State(db): State<DatabaseConnection>,
    _claims: Claims,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(budget_terms_service::get_terms(&db).await?))
}

pub async fn update_terms(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Json(payload): Json<UpdateBudgetTermsInput>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::ManageBudgetTerms)?;
    Ok(Json(budget_terms_service::update_terms(&db, payload).await?))
}
