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
use crate::services::contacto_service::{self, ContactoFilter, ContactoInput};

pub async fn list_contactos(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Query(filter): Query<ContactoFilter>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::ViewBusinesses)?;
    let contactos = contacto_service::list_contactos(&db, filter).await?;
    Ok(Json(json!({ "contactos": contactos, "total": contactos.len() })))
}

pub async fn get_contacto(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::ViewBusinesses)?;
    Ok(Json(contacto_service::find_contacto(&db, id).await?))
}

pub async fn create_contacto(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Json(payload): Json<ContactoInput>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::ManageContacts)?;
    let contacto = contacto_service::create_contacto(&db, payload).await?;
    Ok((StatusCode::CREATED, Json(contacto)))
}

pub async fn update_contacto(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(payload): Json<ContactoInput>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::ManageContacts)?;
    Ok(Json(contacto_service::update_contacto(&db, id, payload).await?))
}

// Refused with 409 while a negocio still points at the contact
pub async fn delete_contacto(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::ManageContacts)?;
    contacto_service::delete_contacto(&db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
