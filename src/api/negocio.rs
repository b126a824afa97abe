use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::auth::Claims;
use crate::domain::{DomainError, EstadoNegocio, Permission};
use crate::services::negocio_service::{
    self, CreateNegocioInput, NegocioFilter, UpdateNegocioInput,
};
use crate::services::numbering;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangeEstadoRequest {
    pub estado: EstadoNegocio,
}

#[utoipa::path(
    get,
    path = "/api/negocios",
    tag = "negocios",
    params(
        ("estado" = Option<String>, Query, description = "Filter by business state"),
        ("contacto_id" = Option<i32>, Query, description = "Filter by contact"),
        ("q" = Option<String>, Query, description = "Event name or number")
    ),
    responses(
        (status = 200, description = "Negocios with computed value"),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = []))
)]
pub async fn list_negocios(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Query(filter): Query<NegocioFilter>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::ViewBusinesses)?;
    let negocios = negocio_service::list_negocios(&db, filter).await?;
    Ok(Json(json!({ "negocios": negocios, "total": negocios.len() })))
}

#[utoipa::path(
    get,
    path = "/api/negocios/{id}",
    tag = "negocios",
    params(("id" = i32, Path, description = "Negocio id")),
    responses(
        (status = 200, description = "Negocio with contact, companies and quotes"),
        (status = 404, description = "Negocio not found")
    ),
    security(("bearer" = []))
)]
pub async fn get_negocio(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::ViewBusinesses)?;
    Ok(Json(negocio_service::get_negocio_detail(&db, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/negocios",
    tag = "negocios",
    request_body = CreateNegocioInput,
    responses(
        (status = 201, description = "Negocio created with the next business number"),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Missing permission")
    ),
    security(("bearer" = []))
)]
pub async fn create_negocio(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Json(payload): Json<CreateNegocioInput>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::CreateBusinesses)?;
    let negocio = negocio_service::create_negocio(&db, payload, claims.uid).await?;
    Ok((StatusCode::CREATED, Json(negocio)))
}

#[utoipa::path(
    put,
    path = "/api/negocios/{id}",
    tag = "negocios",
    params(("id" = i32, Path, description = "Negocio id")),
    request_body = UpdateNegocioInput,
    responses(
        (status = 200, description = "Negocio updated"),
        (status = 404, description = "Negocio not found")
    ),
    security(("bearer" = []))
)]
pub async fn update_negocio(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateNegocioInput>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::EditBusinesses)?;
    Ok(Json(negocio_service::update_negocio(&db, id, payload).await?))
}

pub async fn delete_negocio(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::DeleteBusinesses)?;
    negocio_service::delete_negocio(&db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Manual state change; enqueues a high-priority HubSpot push.
#[utoipa::path(
    put,
    path = "/api/negocios/{id}/estado",
    tag = "negocios",
    params(("id" = i32, Path, description = "Negocio id")),
    request_body = ChangeEstadoRequest,
    responses(
        (status = 200, description = "State changed"),
        (status = 404, description = "Negocio not found")
    ),
    security(("bearer" = []))
)]
pub async fn change_estado(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(payload): Json<ChangeEstadoRequest>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::EditBusinesses)?;
    Ok(Json(negocio_service::change_state(&db, id, payload.estado).await?))
}

pub async fn recalculate(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::EditBusinesses)?;
    let (negocio, changed) = negocio_service::recalculate_state(&db, id).await?;
    Ok(Json(json!({ "negocio": negocio, "changed": changed })))
}

pub async fn export_negocios(
    State(db): State<DatabaseConnection>,
    claims: Claims,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::ViewBusinesses)?;
    let body = negocio_service::export_csv(&db).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"negocios.csv\"",
            ),
        ],
        body,
    ))
}

pub async fn check_numbering(
    State(db): State<DatabaseConnection>,
    claims: Claims,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::ViewBusinesses)?;
    Ok(Json(
        numbering::check_business_numbering_consistency(&db).await?,
    ))
}

pub async fn number_history(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::ViewBusinesses)?;
    Ok(Json(numbering::number_history(&db, id).await?))
}
