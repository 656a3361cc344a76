use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Weekday;
use serde::Deserialize;

use super::authorize;
use crate::errors::{AppError, BookingError};
use crate::models::{Actor, ServiceRecord, StaffRecord, StaffStatus};
use crate::services::store::StaffDirectory;
use crate::state::AppState;

fn require_manager(actor: &Actor) -> Result<(), AppError> {
    if actor.role.is_manager() {
        Ok(())
    } else {
        Err(BookingError::Forbidden {
            role: actor.role,
            action: "update the staff directory",
        }
        .into())
    }
}

#[derive(Deserialize)]
pub struct StaffBody {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub branch_id: Option<String>,
    #[serde(default)]
    pub weekly_schedule: HashMap<Weekday, String>,
}

// PUT /api/tenants/:tenant/staff/:staff_id
pub async fn upsert_staff(
    State(state): State<Arc<AppState>>,
    Path((tenant, staff_id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<StaffBody>,
) -> Result<Json<StaffRecord>, AppError> {
    let actor = authorize(&headers, &state)?;
    require_manager(&actor)?;

    let status = match body.status.as_deref() {
        Some(raw) => StaffStatus::parse(raw)
            .ok_or_else(|| AppError::BadRequest(format!("unknown staff status: {raw}")))?,
        None => StaffStatus::Active,
    };
    let record = StaffRecord {
        id: staff_id,
        name: body.name,
        phone: body.phone,
        status,
        branch_id: body.branch_id,
        weekly_schedule: body.weekly_schedule,
    };

    state.store.upsert_staff(&tenant, &record).await?;
    tracing::info!(tenant = %tenant, staff_id = %record.id, status = record.status.as_str(), "staff record synced");
    Ok(Json(record))
}

#[derive(Deserialize)]
pub struct ServiceBody {
    pub name: String,
    #[serde(default)]
    pub staff_ids: Option<Vec<String>>,
}

// PUT /api/tenants/:tenant/services/:service_id
pub async fn upsert_service(
    State(state): State<Arc<AppState>>,
    Path((tenant, service_id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<ServiceBody>,
) -> Result<Json<ServiceRecord>, AppError> {
    let actor = authorize(&headers, &state)?;
    require_manager(&actor)?;

    let record = ServiceRecord {
        id: service_id,
        name: body.name,
        staff_ids: body.staff_ids,
    };
    state.store.upsert_service(&tenant, &record).await?;
    tracing::info!(tenant = %tenant, service_id = %record.id, "service allow-list synced");
    Ok(Json(record))
}
