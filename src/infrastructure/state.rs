//! Application state shared by the handlers

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::infrastructure::config::Config;
use crate::modules::integrations::hubspot::CrmClient;

#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    /// HubSpot client; tests swap in a fake or a wiremock-backed one
    pub crm: Arc<dyn CrmClient>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, crm: Arc<dyn CrmClient>, config: Config) -> Self {
        Self {
            db,
            crm,
            config: Arc::new(config),
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl AsRef<DatabaseConnection> for AppState {
    fn as_ref(&self) -> &DatabaseConnection {
        &self.db
    }
}

// Lets handlers take `State<DatabaseConnection>` directly
impl axum::extract::FromRef<AppState> for DatabaseConnection {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
