//! Configuration module for the heat network backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for API authentication (required in production)
    pub api_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// API key for the email notification service
    pub notify_api_key: Option<String>,
    /// Base URL of the email notification service
    pub notify_base_url: String,
    /// Template id for the organisation-created email
    pub org_created_template_id: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let api_psk = env::var("HEATNET_API_PSK").ok();

        let db_path = env::var("HEATNET_DB_PATH")
            .unwrap_or_else(|_| "./data/app.sqlite".to_string())
            .into();

        let bind_addr = env::var("HEATNET_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid HEATNET_BIND_ADDR format");

        let log_level = env::var("HEATNET_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let notify_api_key = env::var("HEATNET_NOTIFY_API_KEY").ok();

        let notify_base_url = env::var("HEATNET_NOTIFY_BASE_URL")
            .unwrap_or_else(|_| "https://api.notifications.service.gov.uk".to_string());

        let org_created_template_id = env::var("HEATNET_ORG_CREATED_TEMPLATE_ID")
            .unwrap_or_else(|_| "org-created".to_string());

        Self {
            api_psk,
            db_path,
            bind_addr,
            log_level,
            notify_api_key,
            notify_base_url,
            org_created_template_id,
        }
    }
}
