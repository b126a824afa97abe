use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::DatabaseConnection;
use serde_json::json;

use crate::auth::Claims;
use crate::domain::{DomainError, Permission};
use crate::services::empresa_service::{self, EmpresaFilter, EmpresaInput};

pub async fn list_empresas(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Query(filter): Query<EmpresaFilter>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::ViewBusinesses)?;
    let empresas = empresa_service::list_empresas(&db, filter).await?;
    Ok(Json(json!({ "empresas": empresas, "total": empresas.len() })))
}

pub async fn get_empresa(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::ViewBusinesses)?;
    Ok(Json(empresa_service::find_empresa(&db, id).await?))
}

pub async fn create_empresa(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Json(payload): Json<EmpresaInput>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::ManageCompanies)?;
    let empresa = empresa_service::create_empresa(&db, payload).await?;
    Ok((StatusCode::CREATED, Json(empresa)))
}

pub async fn update_empresa(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(payload): Json<EmpresaInput>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::ManageCompanies)?;
    Ok(Json(empresa_service::update_empresa(&db, id, payload).await?))
}

pub async fn delete_empresa(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::ManageCompanies)?;
    empresa_service::delete_empresa(&db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
