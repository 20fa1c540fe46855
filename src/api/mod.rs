//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP endpoints of the studio site:
//! - Health check
//! - Artwork gallery and digital files
//! - Order requests, newsletter and contact forms
//! - Admin login and back-office endpoints
//! - Static serving of the single-page frontend

pub mod admin;
pub mod artworks;
pub mod contact;
pub mod digital_files;
pub mod extract;
pub mod health;
pub mod middleware;
pub mod newsletter;
pub mod orders;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::config::ServerConfig;

pub use extract::{AdminGuard, ApiJson, ApiPath};
pub use middleware::{ApiError, AppState};

/// Build the `/api` router
pub fn build_api_router(state: &AppState) -> Router<AppState> {
    // Public form endpoints share the stricter limiter
    let form_routes = Router::new()
        .route("/newsletter", post(newsletter::subscribe))
        .route("/newsletter/unsubscribe", post(newsletter::unsubscribe))
        .route("/contact", post(contact::submit))
        .route("/orders", post(orders::create_order))
        .route("/admin/login", post(admin::login))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::form_rate_limit,
        ));

    // Back office (needs a live session)
    let admin_routes = Router::new()
        .route("/admin/dashboard", get(admin::dashboard))
        .route("/admin/orders", get(admin::list_orders))
        .route("/admin/newsletter", get(admin::list_newsletter))
        .route("/admin/contact", get(admin::list_contact))
        .route("/admin/contact/{id}/status", put(admin::update_contact_status))
        .route("/admin/contact/{id}/read", put(admin::mark_contact_read))
        .nest("/admin/artworks", artworks::router(state))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_admin,
        ));

    Router::new()
        .nest("/artworks", artworks::router(state))
        .route("/admin/logout", post(admin::logout))
        .route("/admin/me", get(admin::me))
        .merge(form_routes)
        .merge(admin_routes)
        .fallback(api_not_found)
}

async fn api_not_found() -> ApiError {
    ApiError::not_found("Not found")
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE]);

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    // Credentials are only allowed with an explicit origin list
    if allowed.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(allowed).allow_credentials(true)
    }
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, server: &ServerConfig) -> Router {
    let api = build_api_router(&state).layer(axum_middleware::from_fn_with_state(
        state.clone(),
        middleware::api_rate_limit,
    ));

    // Unknown paths get the SPA entry point so client-side routes work
    let spa = ServeDir::new(&server.static_dir)
        .fallback(ServeFile::new(server.static_dir.join("index.html")));

    Router::new()
        .route("/health", get(health::health))
        .nest("/api", api)
        .fallback_service(spa)
        .layer(cors_layer(&server.cors_origins))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
