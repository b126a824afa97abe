//! Domain error types
//!
//! These errors are framework-agnostic and represent business-level failures.
//! The HTTP layer maps each variant to a status code.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    /// Resource not found
    #[error("{0} not found")]
    NotFound(String),
    /// Validation error with message
    #[error("Validation error: {0}")]
    Validation(String),
    /// Operation not allowed in the current state
    #[error("{0}")]
    InvalidState(String),
    /// Missing or invalid credentials
    #[error("{0}")]
    Unauthorized(String),
    /// Authenticated but lacking a permission
    #[error("Missing permission: {0}")]
    Forbidden(String),
    /// Database/persistence error
    #[error("Database error: {0}")]
    Database(String),
    /// External service error (HubSpot)
    #[error("External service error: {0}")]
    External(String),
    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(what: impl Into<String>) -> Self {
        DomainError::NotFound(what.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        DomainError::Validation(msg.into())
    }
}

// Conversion from SeaORM errors (used in services and infrastructure)
impl From<sea_orm::DbErr> for DomainError {
    fn from(e: sea_orm::DbErr) -> Self {
        DomainError::Database(e.to_string())
    }
}

