use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::auth::{Claims, create_jwt};
use crate::domain::permissions::{self, Permission, Role};
use crate::domain::DomainError;
use crate::models::user;
use crate::services::user_service;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionUser {
    pub id: i32,
    pub username: String,
    pub role: String,
    pub permissions: Vec<Permission>,
}

impl From<&user::Model> for SessionUser {
    fn from(model: &user::Model) -> Self {
        let role = Role::from_str(&model.role).unwrap_or(Role::User);
        Self {
            id: model.id,
            username: model.username.clone(),
            role: role.to_string(),
            permissions: permissions::permissions_for(role),
        }
    }
}

fn issue_token(model: &user::Model) -> Result<String, DomainError> {
    let role = Role::from_str(&model.role).unwrap_or(Role::User);
    create_jwt(&model.username, model.id, role).map_err(DomainError::Internal)
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, DomainError> {
    tracing::info!("Login attempt for user: {}", payload.username);

    let user = user_service::authenticate(&db, &payload.username, &payload.password).await?;
    let token = issue_token(&user)?;

    Ok(Json(json!({
        "token": token,
        "user": SessionUser::from(&user),
    })))
}

/// Creates the first admin account; refused once any user exists.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 201, description = "Admin created"),
        (status = 403, description = "Users already exist")
    )
)]
pub async fn register(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, DomainError> {
    let user = user_service::register_first_admin(&db, payload.username, payload.password).await?;
    let token = issue_token(&user)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "token": token,
            "user": SessionUser::from(&user),
        })),
    ))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = SessionUser),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = []))
)]
pub async fn me(
    State(db): State<DatabaseConnection>,
    claims: Claims,
) -> Result<Json<SessionUser>, DomainError> {
    let user = user_service::find_user(&db, claims.uid).await?;
    Ok(Json(SessionUser::from(&user)))
}
