use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_HUBSPOT_BASE_URL: &str = "https://api.hubapi.com";

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub profile: String,
    pub hubspot_base_url: String,
    pub upload_dir: PathBuf,
    /// Zero disables the scheduled maintenance run
    pub maintenance_interval: Duration,
    pub sync_poll_interval: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        let profile = env::var("PROFILE").unwrap_or_else(|_| "default".to_string());

        let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| {
            if profile == "default" {
                "sqlite://negocios.db?mode=rwc".to_string()
            } else {
                format!("sqlite://negocios_{}.db?mode=rwc", profile)
            }
        });

        Self {
            database_url,
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .ok()
                .map(|s| {
                    s.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_else(Vec::new),
            profile,
            hubspot_base_url: env::var("HUBSPOT_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_HUBSPOT_BASE_URL.to_string()),
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads")),
            maintenance_interval: Duration::from_secs(secs_from_env(
                "MAINTENANCE_INTERVAL_SECS",
                3600,
            )),
            sync_poll_interval: Duration::from_secs(secs_from_env("SYNC_POLL_INTERVAL_SECS", 2)),
        }
    }

    /// Configuration for tests and embedded use: in-memory database, local defaults.
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            port: 0,
            cors_allowed_origins: Vec::new(),
            profile: "test".to_string(),
            hubspot_base_url: DEFAULT_HUBSPOT_BASE_URL.to_string(),
            upload_dir: env::temp_dir().join("negocios-uploads"),
            maintenance_interval: Duration::ZERO,
            sync_poll_interval: Duration::from_secs(2),
        }
    }
}

/// Log filter from `RUST_LOG`, so `.env` must be loaded before calling this.
pub fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "negocios=debug,tower_http=debug".into())
}

fn secs_from_env(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
