use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::auth::Claims;
use crate::domain::{DomainError, EstadoPresupuesto, Permission};
use crate::services::presupuesto_service::{
    self, CreatePresupuestoInput, UpdatePresupuestoInput,
};

#[derive(Debug, Deserialize)]
pub struct PresupuestosQuery {
    pub negocio_id: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangePresupuestoEstadoRequest {
    pub estado: EstadoPresupuesto,
}

pub async fn list_presupuestos(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Query(params): Query<PresupuestosQuery>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::ViewBusinesses)?;
    let presupuestos = presupuesto_service::list_presupuestos(&db, params.negocio_id).await?;
    Ok(Json(json!({
        "presupuestos": presupuestos,
        "total": presupuestos.len()
    })))
}

pub async fn get_presupuesto(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::ViewBusinesses)?;
    Ok(Json(presupuesto_service::get_presupuesto_detail(&db, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/presupuestos",
    tag = "presupuestos",
    request_body = CreatePresupuestoInput,
    responses(
        (status = 201, description = "Quote created with lines and totals"),
        (status = 400, description = "Invalid line"),
        (status = 404, description = "Negocio or product not found")
    ),
    security(("bearer" = []))
)]
pub async fn create_presupuesto(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Json(payload): Json<CreatePresupuestoInput>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::CreateBudgets)?;
    let detail = presupuesto_service::create_presupuesto(&db, payload).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

#[utoipa::path(
    put,
    path = "/api/presupuestos/{id}",
    tag = "presupuestos",
    params(("id" = i32, Path, description = "Presupuesto id")),
    request_body = UpdatePresupuestoInput,
    responses(
        (status = 200, description = "Quote updated; lines replaced when given"),
        (status = 409, description = "Quote is no longer editable")
    ),
    security(("bearer" = []))
)]
pub async fn update_presupuesto(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(payload): Json<UpdatePresupuestoInput>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::EditBudgets)?;
    Ok(Json(presupuesto_service::update_presupuesto(&db, id, payload).await?))
}

pub async fn delete_presupuesto(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::DeleteBudgets)?;
    presupuesto_service::delete_presupuesto(&db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/api/presupuestos/{id}/estado",
    tag = "presupuestos",
    params(("id" = i32, Path, description = "Presupuesto id")),
    request_body = ChangePresupuestoEstadoRequest,
    responses(
        (status = 200, description = "Quote state changed and negocio recalculated"),
        (status = 404, description = "Presupuesto not found")
    ),
    security(("bearer" = []))
)]
pub async fn change_estado(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(payload): Json<ChangePresupuestoEstadoRequest>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::EditBudgets)?;
    let (presupuesto, negocio) =
        presupuesto_service::change_presupuesto_state(&db, id, payload.estado).await?;
    Ok(Json(json!({ "presupuesto": presupuesto, "negocio": negocio })))
}

/// Everything the printable quote needs, in one payload.
pub async fn get_documento(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::ViewBusinesses)?;
    Ok(Json(presupuesto_service::quote_document(&db, id).await?))
}
