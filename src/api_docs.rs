use crate::api;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health::health_check,
        api::auth::login,
        api::auth::register,
        api::auth::me,
        api::dashboard::get_dashboard,
        api::negocio::list_negocios,
        api::negocio::get_negocio,
        api::negocio::create_negocio,
        api::negocio::update_negocio,
        api::negocio::change_estado,
        api::presupuesto::create_presupuesto,
        api::presupuesto::update_presupuesto,
        api::presupuesto::change_estado,
        api::calculator::quote_totals,
        api::calculator::accreditation,
        api::hubspot::get_key_status,
        api::hubspot::save_api_key,
        api::hubspot::save_mappings,
        api::sync::queue_stats,
        api::sync::retry_failed,
        api::sync::resolve_conflict,
        api::functions::business_state_maintenance,
        api::functions::hubspot_pipelines,
        api::functions::upload_brand_logo,
    ),
    components(
        schemas(
            api::auth::LoginRequest,
            api::auth::SessionUser,
            api::negocio::ChangeEstadoRequest,
            api::presupuesto::ChangePresupuestoEstadoRequest,
            api::calculator::QuoteTotalsRequest,
            api::sync::ResolveConflictRequest,
            api::functions::LogoUploadForm,
            crate::domain::EstadoNegocio,
            crate::domain::EstadoPresupuesto,
            crate::domain::Permission,
            crate::domain::quote::QuoteLine,
            crate::domain::quote::QuoteTotals,
            crate::domain::accreditation::AccreditationInput,
            crate::domain::accreditation::AccreditationResult,
            crate::services::negocio_service::CreateNegocioInput,
            crate::services::negocio_service::UpdateNegocioInput,
            crate::services::presupuesto_service::LineInput,
            crate::services::presupuesto_service::CreatePresupuestoInput,
            crate::services::presupuesto_service::UpdatePresupuestoInput,
            crate::services::presupuesto_service::ExpirationReport,
            crate::services::hubspot_config_service::HubspotKeyStatus,
            crate::services::hubspot_config_service::SaveApiKeyInput,
            crate::services::hubspot_config_service::StageMappingInput,
            crate::services::dashboard_service::DashboardStats,
            crate::services::brand_service::LogoUploaded,
            crate::services::maintenance_service::MaintenanceReport,
            crate::services::maintenance_service::AuditReport,
            crate::services::maintenance_service::RecalculationReport,
            crate::services::maintenance_service::Renumbered,
            crate::sync::queue::QueueStats,
            crate::sync::queue::RetryReport,
            crate::sync::SyncStatus,
            crate::sync::Resolution,
            crate::modules::integrations::hubspot::Pipeline,
            crate::modules::integrations::hubspot::PipelineStage,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "negocios", description = "Negocios CRM API"),
        (name = "functions", description = "Maintenance, HubSpot pipelines and logo upload")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
