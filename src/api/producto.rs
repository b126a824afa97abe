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
use crate::services::producto_service::{self, LineaInput, ProductoFilter, ProductoInput};

pub async fn list_productos(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Query(filter): Query<ProductoFilter>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::ViewProducts)?;
    let productos = producto_service::list_productos(&db, filter).await?;
    Ok(Json(json!({ "productos": productos, "total": productos.len() })))
}

pub async fn get_producto(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::ViewProducts)?;
    Ok(Json(producto_service::find_producto(&db, id).await?))
}

pub async fn create_producto(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Json(payload): Json<ProductoInput>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::CreateProducts)?;
    let producto = producto_service::create_producto(&db, payload).await?;
    Ok((StatusCode::CREATED, Json(producto)))
}

pub async fn update_producto(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(payload): Json<ProductoInput>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::EditProducts)?;
    Ok(Json(producto_service::update_producto(&db, id, payload).await?))
}

// Soft delete: quote lines keep pointing at the product
pub async fn delete_producto(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::DeleteProducts)?;
    Ok(Json(producto_service::deactivate_producto(&db, id).await?))
}

pub async fn list_lineas(
    State(db): State<DatabaseConnection>,
    claims: Claims,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::ViewProducts)?;
    Ok(Json(producto_service::list_lineas(&db).await?))
}

pub async fn create_linea(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Json(payload): Json<LineaInput>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::CreateProducts)?;
    let linea = producto_service::create_linea(&db, payload).await?;
    Ok((StatusCode::CREATED, Json(linea)))
}

pub async fn delete_linea(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::DeleteProducts)?;
    producto_service::delete_linea(&db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
