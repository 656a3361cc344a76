use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;

use super::authorize;
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus};
use crate::services::lifecycle::{NewBooking, RevisedBooking, StaffResponse};
use crate::services::store::BookingFilter;
use crate::state::AppState;

// POST /api/tenants/:tenant/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Path(tenant): Path<String>,
    headers: HeaderMap,
    Json(req): Json<NewBooking>,
) -> Result<(StatusCode, Json<RevisedBooking>), AppError> {
    let actor = authorize(&headers, &state)?;
    let created = state.engine.create_booking(&tenant, &actor, req).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

// GET /api/tenants/:tenant/bookings
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    Path(tenant): Path<String>,
    headers: HeaderMap,
    Query(filter): Query<BookingFilter>,
) -> Result<Json<Vec<Booking>>, AppError> {
    authorize(&headers, &state)?;
    let bookings = state.engine.list_bookings(&tenant, &filter).await?;
    Ok(Json(bookings))
}

// GET /api/tenants/:tenant/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path((tenant, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<Booking>, AppError> {
    authorize(&headers, &state)?;
    let booking = state.engine.get_booking(&tenant, &id).await?;
    Ok(Json(booking))
}

// POST /api/tenants/:tenant/bookings/:id/respond
pub async fn respond(
    State(state): State<Arc<AppState>>,
    Path((tenant, id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(response): Json<StaffResponse>,
) -> Result<Json<RevisedBooking>, AppError> {
    let actor = authorize(&headers, &state)?;
    let revised = state.engine.respond(&tenant, &id, &actor, response).await?;
    Ok(Json(revised))
}

#[derive(Deserialize)]
pub struct AssignRequest {
    pub staff_id: String,
}

// POST /api/tenants/:tenant/bookings/:id/services/:service_id/assign
pub async fn assign_service(
    State(state): State<Arc<AppState>>,
    Path((tenant, id, service_id)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(req): Json<AssignRequest>,
) -> Result<Json<RevisedBooking>, AppError> {
    let actor = authorize(&headers, &state)?;
    let revised = state
        .engine
        .reassign_service(&tenant, &id, &service_id, &req.staff_id, &actor)
        .await?;
    Ok(Json(revised))
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: String,
    #[serde(default)]
    pub reason: Option<String>,
}

// POST /api/tenants/:tenant/bookings/:id/status
pub async fn change_status(
    State(state): State<Arc<AppState>>,
    Path((tenant, id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(req): Json<StatusRequest>,
) -> Result<Json<RevisedBooking>, AppError> {
    let actor = authorize(&headers, &state)?;
    let next = BookingStatus::parse(&req.status)
        .ok_or_else(|| AppError::BadRequest(format!("unknown status: {}", req.status)))?;
    let revised = state
        .engine
        .transition(&tenant, &id, &actor, next, req.reason)
        .await?;
    Ok(Json(revised))
}
