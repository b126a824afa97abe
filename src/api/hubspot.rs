//! Per-user HubSpot credentials and stage mapping.
//! Keys are never returned in clear; reads show the masked form.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::DatabaseConnection;

use crate::auth::Claims;
use crate::domain::{DomainError, Permission};
use crate::services::hubspot_config_service::{
    self, HubspotKeyStatus, SaveApiKeyInput, StageMappingInput,
};

#[utoipa::path(
    get,
    path = "/api/hubspot/api-key",
    tag = "hubspot",
    responses(
        (status = 200, description = "Masked key status", body = HubspotKeyStatus)
    ),
    security(("bearer" = []))
)]
pub async fn get_key_status(
    State(db): State<DatabaseConnection>,
    claims: Claims,
) -> Result<Json<HubspotKeyStatus>, DomainError> {
    claims.require(Permission::ManageHubspot)?;
    Ok(Json(hubspot_config_service::key_status(&db, claims.uid).await?))
}

#[utoipa::path(
    put,
    path = "/api/hubspot/api-key",
    tag = "hubspot",
    request_body = SaveApiKeyInput,
    responses(
        (status = 200, description = "Key stored", body = HubspotKeyStatus),
        (status = 400, description = "Empty key")
    ),
    security(("bearer" = []))
)]
pub async fn save_api_key(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Json(payload): Json<SaveApiKeyInput>,
) -> Result<Json<HubspotKeyStatus>, DomainError> {
    claims.require(Permission::ManageHubspot)?;
    Ok(Json(
        hubspot_config_service::save_api_key(&db, claims.uid, payload).await?,
    ))
}

pub async fn delete_api_key(
    State(db): State<DatabaseConnection>,
    claims: Claims,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::ManageHubspot)?;
    hubspot_config_service::delete_api_key(&db, claims.uid).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_mappings(
    State(db): State<DatabaseConnection>,
    claims: Claims,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::ManageHubspot)?;
    Ok(Json(
        hubspot_config_service::list_stage_mappings(&db, claims.uid).await?,
    ))
}

/// Replaces the caller's whole mapping.
#[utoipa::path(
    put,
    path = "/api/hubspot/stage-mappings",
    tag = "hubspot",
    request_body = Vec<StageMappingInput>,
    responses(
        (status = 200, description = "Mapping replaced"),
        (status = 400, description = "Blank stage id or repeated estado")
    ),
    security(("bearer" = []))
)]
pub async fn save_mappings(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Json(payload): Json<Vec<StageMappingInput>>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::ManageHubspot)?;
    Ok(Json(
        hubspot_config_service::save_stage_mappings(&db, claims.uid, payload).await?,
    ))
}
