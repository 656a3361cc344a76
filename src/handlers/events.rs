use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, Sse};
use axum::Json;
use serde::Deserialize;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::{BroadcastStream, IntervalStream};
use tokio_stream::StreamExt;

use super::{authorize, check_auth};
use crate::errors::AppError;
use crate::models::{AuditEntry, EventEnvelope};
use crate::services::events::replay_since;
use crate::services::store::AuditLog;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AuditQuery {
    pub booking_id: Option<String>,
}

// GET /api/tenants/:tenant/audit
pub async fn audit_log(
    State(state): State<Arc<AppState>>,
    Path(tenant): Path<String>,
    headers: HeaderMap,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditEntry>>, AppError> {
    authorize(&headers, &state)?;
    let entries = state
        .store
        .entries_for(&tenant, query.booking_id.as_deref())
        .await?;
    Ok(Json(entries))
}

#[derive(Deserialize)]
pub struct SseQuery {
    pub token: Option<String>,
    pub last_id: Option<i64>,
}

fn to_sse(envelope: &EventEnvelope) -> Event {
    let data = serde_json::to_string(envelope).unwrap_or_default();
    let event = Event::default()
        .event(envelope.event.kind.as_str())
        .data(data);
    match envelope.id {
        Some(id) => event.id(id.to_string()),
        None => event,
    }
}

// GET /api/tenants/:tenant/events (SSE)
pub async fn events_stream(
    State(state): State<Arc<AppState>>,
    Path(tenant): Path<String>,
    headers: HeaderMap,
    Query(query): Query<SseQuery>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>, AppError> {
    // EventSource cannot set headers, so the token may come in the query string
    let query_token_ok = query
        .token
        .as_deref()
        .is_some_and(|t| !t.is_empty() && t == state.config.admin_token);
    if !query_token_ok {
        check_auth(&headers, &state.config.admin_token)?;
    }

    // subscribe before the catch-up read so nothing falls between the two
    let rx = state.events().subscribe();
    let last_id = query.last_id.unwrap_or(0);
    let catchup = replay_since(&state.store, &tenant, last_id).await?;
    let replayed_up_to = catchup.last().and_then(|e| e.id).unwrap_or(last_id);

    let catchup_stream =
        tokio_stream::iter(catchup.into_iter().map(|e| Ok::<_, Infallible>(to_sse(&e))));

    let live_tenant = tenant.clone();
    let live_stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(envelope) => {
            let for_tenant = envelope.event.context.tenant_id == live_tenant;
            let already_sent = envelope.id.is_some_and(|id| id <= replayed_up_to);
            (for_tenant && !already_sent).then(|| Ok(to_sse(&envelope)))
        }
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(tenant = %live_tenant, skipped, "SSE client lagged, events dropped");
            None
        }
    });

    let keepalive_stream = IntervalStream::new(tokio::time::interval(Duration::from_secs(30)))
        .map(|_| Ok(Event::default().comment("keepalive")));

    let merged = catchup_stream.chain(live_stream).merge(keepalive_stream);
    Ok(Sse::new(merged))
}
