use axum::{Json, extract::State};
use sea_orm::DatabaseConnection;

use crate::auth::Claims;
use crate::domain::{DomainError, Permission};
use crate::services::dashboard_service::{self, DashboardStats};

#[utoipa::path(
    get,
    path = "/api/dashboard",
    tag = "dashboard",
    responses(
        (status = 200, description = "Pipeline and sync aggregates", body = DashboardStats),
        (status = 403, description = "Missing permission")
    ),
    security(("bearer" = []))
)]
pub async fn get_dashboard(
    State(db): State<DatabaseConnection>,
    claims: Claims,
) -> Result<Json<DashboardStats>, DomainError> {
    claims.require(Permission::ViewDashboard)?;
    Ok(Json(dashboard_service::get_stats(&db).await?))
}
