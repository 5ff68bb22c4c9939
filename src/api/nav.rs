//! Navigation API endpoints

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::api::middleware::{AppState, AuthenticatedUser};
use crate::models::NavSection;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_navigation))
}

#[derive(Serialize)]
struct NavigationResponse {
    name: String,
    role: String,
    designation: Option<String>,
    sections: Vec<NavSection>,
}

/// GET /api/v1/nav - Sections the current role may see, in tree order
async fn get_navigation(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Json<NavigationResponse> {
    let user = user.0;
    let sections = state.access.navigation_for(&user.role);
    if sections.is_empty() {
        tracing::debug!("No navigation sections for role '{}'", user.role);
    }

    Json(NavigationResponse {
        name: user.name,
        role: user.role.to_string(),
        designation: user.designation,
        sections,
    })
}
