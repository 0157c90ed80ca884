//! Heat Network Registration Backend
//!
//! A REST backend for organisation onboarding and heat network registration,
//! with SQLite persistence and best-effort email notification.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod ids;
mod models;
mod notify;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;
use notify::Notifier;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub notifier: Arc<Notifier>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Heat Network Registration Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Warn if PSK is not configured
    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (HEATNET_API_PSK). Authentication is disabled!");
    }

    // Warn if email notification is not configured
    if config.notify_api_key.is_none() {
        tracing::warn!(
            "No notification API key configured (HEATNET_NOTIFY_API_KEY). Emails will not be sent!"
        );
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Initialize notification client
    let notifier = Arc::new(Notifier::new(&config));

    // Create application state
    let state = AppState {
        repo,
        notifier,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone PSK for the auth layer
    let psk = state.config.api_psk.clone();

    // API routes
    let api_routes = Router::new()
        // Users
        .route("/users", get(api::list_users))
        .route("/users/initial-entry", post(api::register_initial_user))
        .route(
            "/users/external/{external_login_id}",
            get(api::get_user_by_external_login_id),
        )
        .route("/users/{id}", get(api::get_user))
        .route("/users/{id}", delete(api::delete_user))
        .route("/users/{id}/org-details", patch(api::update_org_details))
        // Heat networks
        .route("/heat-networks", get(api::list_heat_networks))
        .route("/heat-networks", post(api::create_heat_network))
        .route(
            "/heat-networks/by-hn-ids",
            get(api::get_heat_networks_by_hn_ids),
        )
        .route("/heat-networks/{id}", get(api::get_heat_network))
        .route("/heat-networks/{id}", delete(api::delete_heat_network))
        // Apply PSK auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
