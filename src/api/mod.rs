pub mod auth;
pub mod calculator;
pub mod contacto;
pub mod dashboard;
pub mod empresa;
pub mod error;
pub mod functions;
pub mod health;
pub mod hubspot;
pub mod negocio;
pub mod presupuesto;
pub mod producto;
pub mod settings;
pub mod sync;
pub mod user;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};

use crate::infrastructure::AppState;

pub fn api_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Auth
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
        .route("/auth/me", get(auth::me))
        // Users
        .route("/users", get(user::list_users).post(user::create_user))
        .route(
            "/users/:id",
            put(user::update_user).delete(user::delete_user),
        )
        // Dashboard
        .route("/dashboard", get(dashboard::get_dashboard))
        // Companies & contacts
        .route(
            "/empresas",
            get(empresa::list_empresas).post(empresa::create_empresa),
        )
        .route(
            "/empresas/:id",
            get(empresa::get_empresa)
                .put(empresa::update_empresa)
                .delete(empresa::delete_empresa),
        )
        .route(
            "/contactos",
            get(contacto::list_contactos).post(contacto::create_contacto),
        )
        .route(
            "/contactos/:id",
            get(contacto::get_contacto)
                .put(contacto::update_contacto)
                .delete(contacto::delete_contacto),
        )
        // Negocios
        .route(
            "/negocios",
            get(negocio::list_negocios).post(negocio::create_negocio),
        )
        .route("/negocios/export", get(negocio::export_negocios))
        .route("/negocios/numbering", get(negocio::check_numbering))
        .route(
            "/negocios/:id",
            get(negocio::get_negocio)
                .put(negocio::update_negocio)
                .delete(negocio::delete_negocio),
        )
        .route("/negocios/:id/estado", put(negocio::change_estado))
        .route("/negocios/:id/recalculate", post(negocio::recalculate))
        .route("/negocios/:id/numbers", get(negocio::number_history))
        // Presupuestos
        .route(
            "/presupuestos",
            get(presupuesto::list_presupuestos).post(presupuesto::create_presupuesto),
        )
        .route(
            "/presupuestos/:id",
            get(presupuesto::get_presupuesto)
                .put(presupuesto::update_presupuesto)
                .delete(presupuesto::delete_presupuesto),
        )
        .route("/presupuestos/:id/estado", put(presupuesto::change_estado))
        .route("/presupuestos/:id/documento", get(presupuesto::get_documento))
        // Product library
        .route(
            "/productos",
            get(producto::list_productos).post(producto::create_producto),
        )
        .route(
            "/productos/:id",
            get(producto::get_producto)
                .put(producto::update_producto)
                .delete(producto::delete_producto),
        )
        .route(
            "/lineas-producto",
            get(producto::list_lineas).post(producto::create_linea),
        )
        .route(
            "/lineas-producto/:id",
            axum::routing::delete(producto::delete_linea),
        )
        // Calculators
        .route("/calculators/quote-totals", post(calculator::quote_totals))
        .route("/calculators/accreditation", post(calculator::accreditation))
        // Settings
        .route(
            "/configuracion/marca",
            get(settings::get_brand).put(settings::update_brand),
        )
        .route(
            "/configuracion/terminos",
            get(settings::get_terms).put(settings::update_terms),
        )
        // HubSpot configuration
        .route(
            "/hubspot/api-key",
            get(hubspot::get_key_status)
                .put(hubspot::save_api_key)
                .delete(hubspot::delete_api_key),
        )
        .route(
            "/hubspot/stage-mappings",
            get(hubspot::list_mappings).put(hubspot::save_mappings),
        )
        // Sync queue & conflicts
        .route("/sync/queue", get(sync::list_queue))
        .route("/sync/stats", get(sync::queue_stats))
        .route("/sync/retry", post(sync::retry_failed))
        .route("/sync/purge", post(sync::purge_finished))
        .route("/sync/process", post(sync::process_next))
        .route("/sync/pull", post(sync::schedule_pulls))
        .route("/sync/negocios/:id/pull", post(sync::pull_negocio))
        .route("/sync/conflicts", get(sync::list_conflicts))
        .route("/sync/conflicts/:id/resolve", post(sync::resolve_conflict))
        // Serverless-style functions
        .route(
            "/functions/business-state-maintenance",
            post(functions::business_state_maintenance).fallback(functions::method_not_allowed),
        )
        .route(
            "/functions/hubspot-pipelines",
            get(functions::hubspot_pipelines).fallback(functions::method_not_allowed),
        )
        .route(
            "/functions/upload-brand-logo",
            post(functions::upload_brand_logo)
                .fallback(functions::method_not_allowed)
                .layer(DefaultBodyLimit::max(functions::UPLOAD_BODY_LIMIT)),
        )
        .with_state(state)
}
