pub mod budget_terms_config;
pub mod business_number_log;
pub mod configuracion_marca;
pub mod contacto;
pub mod empresa;
pub mod hubspot_api_key;
pub mod hubspot_stage_mapping;
pub mod linea_producto;
pub mod negocio;
pub mod presupuesto;
pub mod producto_biblioteca;
pub mod producto_presupuesto;
pub mod sync_conflict;
pub mod sync_queue;
pub mod user;
