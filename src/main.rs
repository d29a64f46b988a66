//! Canopy Backend
//!
//! REST backend for a community tree-planting tracker: tree registration,
//! growth updates, an aggregated public feed, a planter leaderboard, and
//! threshold-based achievement badges, over SQLite persistence.

mod achievements;
mod api;
mod auth;
mod config;
mod db;
mod errors;
mod feed;
mod leaderboard;
mod models;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use achievements::AchievementEngine;
use config::Config;
use db::Repository;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub engine: Arc<AchievementEngine>,
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

    tracing::info!("Starting Canopy Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Warn if the gateway secret is not configured
    if config.gateway_psk.is_none() {
        tracing::warn!("No gateway secret configured (CANOPY_GATEWAY_PSK). Gateway checks are disabled!");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Create application state
    let state = AppState {
        engine: Arc::new(AchievementEngine::new(repo.clone())),
        repo,
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

    // Clone the gateway secret for the auth layer
    let psk = state.config.gateway_psk.clone();

    // API routes
    let api_routes = Router::new()
        // Feed & gallery
        .route("/gallery", get(api::get_feed))
        .route("/gallery", post(api::create_gallery_item))
        .route("/gallery/{id}/like", post(api::like_gallery_item))
        // Leaderboard
        .route("/leaderboard", get(api::get_leaderboard))
        // Trees
        .route("/trees", get(api::list_trees))
        .route("/trees", post(api::create_tree))
        .route("/trees/{id}", get(api::get_tree))
        .route("/trees/{id}", put(api::update_tree))
        .route("/trees/{id}", delete(api::delete_tree))
        .route("/trees/{id}/updates", post(api::create_tree_update))
        // Events
        .route("/events", get(api::list_events))
        .route("/events", post(api::create_event))
        .route("/events/{id}", get(api::get_event))
        .route("/events/{id}/join", post(api::join_event))
        // Stats
        .route("/stats", get(api::get_stats))
        .route("/stats/user/{id}", get(api::get_user_stats))
        // Current user & notifications
        .route("/users/me", get(api::get_me))
        .route("/notifications", get(api::list_notifications))
        .route("/notifications/{id}/seen", put(api::mark_notification_seen))
        // Badge templates
        .route("/badges", get(api::list_badge_templates))
        .route("/badges", post(api::create_badge_template))
        .route("/badges/{id}", put(api::update_badge_template))
        .route("/badges/{id}", delete(api::delete_badge_template))
        // Admin
        .route("/admin/users", get(api::list_users))
        .route("/admin/users", post(api::create_user))
        .route("/admin/users/{id}/role", put(api::update_user_role))
        .route("/admin/users/{id}/verify", put(api::verify_user))
        .route("/admin/users/{id}", delete(api::delete_user))
        .route("/admin/summary", get(api::get_admin_summary))
        .route("/admin/message/{user_id}", post(api::message_user))
        .route("/admin/trees/{id}/remind", post(api::remind_tree_update))
        // Apply gateway auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::gateway_auth_layer(psk.clone(), req, next)
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
