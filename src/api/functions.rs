//! Serverless-style endpoints under `/api/functions`.
//! Each one answers an unsupported method with 405 and a JSON error.

use axum::{
    Json,
    extract::{Multipart, State},
    response::Response,
};

use crate::auth::Claims;
use crate::domain::{DomainError, Permission};
use crate::infrastructure::AppState;
use crate::modules::integrations::hubspot::{CrmError, Pipeline};
use crate::services::brand_service::{self, LogoUploaded, MAX_LOGO_BYTES};
use crate::services::hubspot_config_service;
use crate::services::maintenance_service::{self, MaintenanceReport};
use utoipa::ToSchema;

/// Room for the multipart framing around a maximum-size logo.
pub const UPLOAD_BODY_LIMIT: usize = MAX_LOGO_BYTES + 64 * 1024;

pub async fn method_not_allowed() -> Response {
    super::error::method_not_allowed()
}

#[utoipa::path(
    post,
    path = "/api/functions/business-state-maintenance",
    tag = "functions",
    responses(
        (
            status = 200,
            description = "Audit, expiry and recalculation report",
            body = MaintenanceReport
        ),
        (status = 403, description = "Missing permission"),
        (status = 405, description = "Method not allowed")
    ),
    security(("bearer" = []))
)]
pub async fn business_state_maintenance(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<MaintenanceReport>, DomainError> {
    claims.require(Permission::RunMaintenance)?;
    tracing::info!("Maintenance requested by {}", claims.sub);
    Ok(Json(
        maintenance_service::run_business_state_maintenance(state.db()).await?,
    ))
}

/// Deal pipelines of the caller's HubSpot portal, fetched with the caller's key.
#[utoipa::path(
    get,
    path = "/api/functions/hubspot-pipelines",
    tag = "functions",
    responses(
        (status = 200, description = "Pipelines with their stages", body = Vec<Pipeline>),
        (status = 400, description = "No active HubSpot key"),
        (status = 502, description = "HubSpot request failed")
    ),
    security(("bearer" = []))
)]
pub async fn hubspot_pipelines(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Vec<Pipeline>>, DomainError> {
    claims.require(Permission::ManageHubspot)?;

    let api_key = hubspot_config_service::active_api_key(state.db(), claims.uid)
        .await?
        .ok_or_else(|| DomainError::validation("No active HubSpot API key configured"))?;

    let pipelines = state.crm.list_pipelines(&api_key).await.map_err(|e| {
        tracing::warn!("HubSpot pipelines for user {} failed: {}", claims.uid, e);
        match e {
            CrmError::BadUrl(msg) => DomainError::Internal(msg),
            other => DomainError::External(other.to_string()),
        }
    })?;

    Ok(Json(pipelines))
}

/// Multipart body of the logo upload.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct LogoUploadForm {
    #[schema(value_type = String, format = Binary)]
    logo: Vec<u8>,
}

#[utoipa::path(
    post,
    path = "/api/functions/upload-brand-logo",
    tag = "functions",
    request_body(
        content = LogoUploadForm,
        content_type = "multipart/form-data",
        description = "PNG or JPEG in the `logo` field"
    ),
    responses(
        (status = 200, description = "Logo stored", body = LogoUploaded),
        (status = 400, description = "Missing, oversized or undecodable image"),
        (status = 405, description = "Method not allowed")
    ),
    security(("bearer" = []))
)]
pub async fn upload_brand_logo(
    State(state): State<AppState>,
    claims: Claims,
    mut multipart: Multipart,
) -> Result<Json<LogoUploaded>, DomainError> {
    claims.require(Permission::ManageBrand)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| DomainError::validation(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("logo") {
            continue;
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| DomainError::validation(format!("Could not read logo: {}", e)))?;

        let uploaded =
            brand_service::save_logo(state.db(), &state.config.upload_dir, &bytes).await?;
        return Ok(Json(uploaded));
    }

    Err(DomainError::validation("Missing `logo` file field"))
}
