use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::DatabaseConnection;
use serde_json::json;

use crate::auth::Claims;
use crate::domain::{DomainError, Permission};
use crate::services::user_service::{self, NewUserInput, UpdateUserInput};

pub async fn list_users(
    State(db): State<DatabaseConnection>,
    claims: Claims,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::ManageUsers)?;
    let users = user_service::list_users(&db).await?;
    Ok(Json(json!({ "users": users, "total": users.len() })))
}

pub async fn create_user(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Json(payload): Json<NewUserInput>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::ManageUsers)?;
    let user = user_service::create_user(&db, payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update_user(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateUserInput>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::ManageUsers)?;
    Ok(Json(user_service::update_user(&db, id, payload).await?))
}

pub async fn delete_user(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Permission::ManageUsers)?;
    if id == claims.uid {
        return Err(DomainError::InvalidState(
            "You cannot delete your own account".to_string(),
        ));
    }
    user_service::delete_user(&db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
