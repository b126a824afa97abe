//! User Service - accounts and credentials
#![allow(clippy::needless_update)] // SeaORM ActiveModels require ..Default::default()

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::str::FromStr;
use utoipa::ToSchema;

use super::now_timestamp;
use crate::auth::{hash_password, verify_password};
use crate::domain::{DomainError, Role};
use crate::models::user;

const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewUserInput {
    pub username: String,
    pub password: String,
    /// `admin` or `user`; defaults to `user`
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateUserInput {
    pub password: Option<String>,
    pub role: Option<String>,
}

fn parse_role(raw: Option<&str>) -> Result<Role, DomainError> {
    match raw {
        None => Ok(Role::User),
        Some(r) => Role::from_str(r)
            .map_err(|_| DomainError::validation(format!("Unknown role '{}'", r))),
    }
}

fn check_password(password: &str) -> Result<(), DomainError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(DomainError::validation(format!(
            "password must have at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

pub async fn count_users<C: ConnectionTrait>(db: &C) -> Result<u64, DomainError> {
    Ok(user::Entity::find().count(db).await?)
}

pub async fn find_user<C: ConnectionTrait>(db: &C, id: i32) -> Result<user::Model, DomainError> {
    user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("User {}", id)))
}

pub async fn list_users<C: ConnectionTrait>(db: &C) -> Result<Vec<user::Model>, DomainError> {
    Ok(user::Entity::find()
        .order_by_asc(user::Column::Username)
        .all(db)
        .await?)
}

pub async fn create_user<C: ConnectionTrait>(
    db: &C,
    input: NewUserInput,
) -> Result<user::Model, DomainError> {
    let username = input.username.trim().to_lowercase();
    if username.is_empty() {
        return Err(DomainError::validation("username is required"));
    }
    check_password(&input.password)?;
    let role = parse_role(input.role.as_deref())?;

    let taken = user::Entity::find()
        .filter(user::Column::Username.eq(username.as_str()))
        .one(db)
        .await?;
    if taken.is_some() {
        return Err(DomainError::validation(format!("username '{}' is taken", username)));
    }

    let password_hash = hash_password(&input.password).map_err(DomainError::Internal)?;
    let now = now_timestamp();

    let created = user::ActiveModel {
        username: Set(username),
        password_hash: Set(password_hash),
        role: Set(role.to_string()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!("Created user {} ({})", created.username, created.role);
    Ok(created)
}

/// First-run registration: only allowed on an empty user table, creates an admin.
pub async fn register_first_admin<C: ConnectionTrait>(
    db: &C,
    username: String,
    password: String,
) -> Result<user::Model, DomainError> {
    if count_users(db).await? > 0 {
        return Err(DomainError::Forbidden(
            "registration is closed; ask an admin for an account".to_string(),
        ));
    }

    create_user(
        db,
        NewUserInput {
            username,
            password,
            role: Some(Role::Admin.to_string()),
        },
    )
    .await
}

pub async fn authenticate<C: ConnectionTrait>(
    db: &C,
    username: &str,
    password: &str,
) -> Result<user::Model, DomainError> {
    let invalid = || DomainError::Unauthorized("Invalid username or password".to_string());

    let found = user::Entity::find()
        .filter(user::Column::Username.eq(username.trim().to_lowercase()))
        .one(db)
        .await?
        .ok_or_else(invalid)?;

    if verify_password(password, &found.password_hash).map_err(DomainError::Internal)? {
        Ok(found)
    } else {
        tracing::warn!("Failed login for {}", found.username);
        Err(invalid())
    }
}

pub async fn update_user<C: ConnectionTrait>(
    db: &C,
    id: i32,
    input: UpdateUserInput,
) -> Result<user::Model, DomainError> {
    let existing = find_user(db, id).await?;
    let mut active: user::ActiveModel = existing.into();

    if let Some(password) = input.password {
        check_password(&password)?;
        active.password_hash = Set(hash_password(&password).map_err(DomainError::Internal)?);
    }
    if input.role.is_some() {
        active.role = Set(parse_role(input.role.as_deref())?.to_string());
    }

    active.updated_at = Set(now_timestamp());
    Ok(active.update(db).await?)
}

/// Deleting the last admin would lock everyone out of user management.
pub async fn delete_user<C: ConnectionTrait>(db: &C, id: i32) -> Result<(), DomainError> {
    let existing = find_user(db, id).await?;

    if existing.role == Role::Admin.as_ref() {
        let admins = user::Entity::find()
            .filter(user::Column::Role.eq(Role::Admin.as_ref()))
            .count(db)
            .await?;
        if admins <= 1 {
            return Err(DomainError::InvalidState(
                "cannot delete the last admin".to_string(),
            ));
        }
    }

    existing.delete(db).await?;
    Ok(())
}
