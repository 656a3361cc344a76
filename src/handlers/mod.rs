pub mod bookings;
pub mod directory;
pub mod events;
pub mod health;

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::errors::AppError;
use crate::models::{Actor, Role};
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let tenant_routes = Router::new()
        .route(
            "/bookings",
            post(bookings::create_booking).get(bookings::list_bookings),
        )
        .route("/bookings/:id", get(bookings::get_booking))
        .route("/bookings/:id/respond", post(bookings::respond))
        .route(
            "/bookings/:id/services/:service_id/assign",
            post(bookings::assign_service),
        )
        .route("/bookings/:id/status", post(bookings::change_status))
        .route("/staff/:staff_id", put(directory::upsert_staff))
        .route("/services/:service_id", put(directory::upsert_service))
        .route("/audit", get(events::audit_log))
        .route("/events", get(events::events_stream));

    Router::new()
        .route("/health", get(health::health))
        .nest("/api/tenants/:tenant", tenant_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

pub(crate) fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let token = header_str(headers, "authorization")
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");

    if expected_token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

/// The acting user as declared by the calling service. No headers means an
/// anonymous customer submission.
pub(crate) fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, AppError> {
    let role = match header_str(headers, "x-actor-role") {
        Some(raw) => Some(
            Role::parse(raw)
                .ok_or_else(|| AppError::BadRequest(format!("unknown actor role: {raw}")))?,
        ),
        None => None,
    };

    match (header_str(headers, "x-actor-id"), role) {
        (Some(id), role) => Ok(Actor::new(id, role.unwrap_or(Role::Customer))),
        (None, None) | (None, Some(Role::Customer)) => Ok(Actor::anonymous()),
        (None, Some(_)) => Err(AppError::BadRequest(
            "X-Actor-Role requires X-Actor-Id".to_string(),
        )),
    }
}

/// Authenticates the caller and resolves the actor in one step.
pub(crate) fn authorize(headers: &HeaderMap, state: &AppState) -> Result<Actor, AppError> {
    check_auth(headers, &state.config.admin_token)?;
    actor_from_headers(headers)
}
