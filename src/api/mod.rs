//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP API endpoints for the AINE backend.
//! It includes:
//! - Auth endpoints (login, logout, profile, first-run setup)
//! - Role-resolved navigation
//! - Dashboard, overview and report summaries
//! - Student, faculty/leave, finance and stock records
//! - Settings (account creation)
//!
//! Everything except login and setup sits behind the identity gate. Each
//! section group is additionally gated by its navigation section path.

pub mod auth;
pub mod faculty;
pub mod finance;
pub mod middleware;
pub mod nav;
pub mod reports;
pub mod settings;
pub mod stock;
pub mod students;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use middleware::{ApiError, AppState, AuthenticatedUser, SectionGate};

/// Nest `routes` at `path`, gated by the navigation section with the same path
fn section(state: &AppState, path: &'static str, routes: Router<AppState>) -> Router<AppState> {
    Router::new().nest(
        path,
        routes.route_layer(axum_middleware::from_fn_with_state(
            SectionGate::new(state, path),
            middleware::require_section,
        )),
    )
}

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Section routes (need auth and a role listed on the section)
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .nest("/nav", nav::router())
        .merge(section(&state, "/dashboard", reports::dashboard_router()))
        .merge(section(&state, "/students", students::router()))
        .merge(section(&state, "/faculty", faculty::router()))
        .merge(section(&state, "/finance", finance::router()))
        .merge(section(&state, "/stock", stock::router()))
        .merge(section(&state, "/reports", reports::router()))
        .merge(section(&state, "/settings", settings::router()))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .nest("/auth", auth::public_router())
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);
    match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(_) => tracing::warn!("Ignoring invalid CORS origin '{}'", cors_origin),
    }

    Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
