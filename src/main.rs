use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use negocios::infrastructure::AppState;
use negocios::modules::integrations::hubspot::{CrmClient, HubSpotClient};
use negocios::services::maintenance_service;
use negocios::{config, db, seed, server, sync};

#[tokio::main]
async fn main() {
    // RUST_LOG may come from .env
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(config::log_filter())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config = config::Config::from_env();
    tracing::info!("Starting negocios-crm (profile: {})", config.profile);

    // Initialize database
    let db = db::init_db(&config.database_url)
        .await
        .expect("Failed to initialize database");

    // Check for seed flag
    if std::env::var("SEED_DEMO").is_ok() {
        tracing::info!("Seeding demo data...");
        if let Err(e) = seed::seed_demo_data(&db).await {
            tracing::error!("Failed to seed data: {}", e);
        }
    }

    let crm: Arc<dyn CrmClient> = Arc::new(
        HubSpotClient::new(&config.hubspot_base_url).expect("Invalid HUBSPOT_BASE_URL"),
    );

    // HubSpot sync processor
    tokio::spawn(sync::run_processor(
        db.clone(),
        crm.clone(),
        config.sync_poll_interval,
    ));

    // Scheduled business-state maintenance
    tokio::spawn(maintenance_service::run_scheduler(
        db.clone(),
        config.maintenance_interval,
    ));

    let state = AppState::new(db, crm, config);
    if let Err(e) = server::start_server(state).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}
