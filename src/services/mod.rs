//! Services Layer
//!
//! This module contains the business logic behind the HTTP handlers.
//! Handlers stay thin: parse, check permissions, call a service, map errors.

pub mod brand_service;
pub mod budget_terms_service;
pub mod contacto_service;
pub mod dashboard_service;
pub mod empresa_service;
pub mod hubspot_config_service;
pub mod maintenance_service;
pub mod negocio_service;
pub mod numbering;
pub mod presupuesto_service;
pub mod producto_service;
pub mod user_service;

use chrono::{SecondsFormat, Utc};

/// Fixed-width UTC timestamp, so stored values sort lexicographically.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Trim an optional text field, mapping blank to `None`.
pub(crate) fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
