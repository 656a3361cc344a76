use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};

use crate::models::{AuditEntry, EventEnvelope};
use crate::services::store::AuditLog;

const BACKFILL_PAGE: usize = 500;

pub fn audit_entry(envelope: &EventEnvelope) -> AuditEntry {
    let event = &envelope.event;
    let ctx = &event.context;
    AuditEntry {
        id: None,
        tenant_id: ctx.tenant_id.clone(),
        actor: ctx.actor.clone(),
        action: event.kind.as_str().to_string(),
        entity: ctx.booking_id.clone(),
        before_status: ctx.before,
        after_status: ctx.after,
        event_id: envelope.id,
        created_at: None,
    }
}

/// Audits every journaled event that has no entry yet. Returns how many were written.
pub async fn backfill(audit: &dyn AuditLog) -> anyhow::Result<usize> {
    let mut after = 0;
    let mut written = 0;
    loop {
        let page = audit.unaudited_events(after, BACKFILL_PAGE).await?;
        for envelope in &page {
            if audit.record(&audit_entry(envelope)).await? {
                written += 1;
            }
            if let Some(id) = envelope.id {
                after = id;
            }
        }
        if page.len() < BACKFILL_PAGE {
            return Ok(written);
        }
    }
}

async fn catch_up(audit: &dyn AuditLog) {
    match backfill(audit).await {
        Ok(0) => {}
        Ok(written) => tracing::info!(written, "audit log backfilled from the event journal"),
        Err(e) => tracing::error!(error = %e, "audit backfill failed"),
    }
}

/// Records one audit entry per lifecycle event until the bus closes.
///
/// Entries are keyed by journal id, so events missed while lagging are
/// recovered from the journal and events seen twice are written once.
pub async fn run_audit_log(audit: Arc<dyn AuditLog>, mut rx: broadcast::Receiver<EventEnvelope>) {
    catch_up(audit.as_ref()).await;
    loop {
        match rx.recv().await {
            Ok(envelope) => {
                let entry = audit_entry(&envelope);
                if let Err(e) = audit.record(&entry).await {
                    tracing::error!(
                        tenant = %entry.tenant_id,
                        booking_id = %entry.entity,
                        action = %entry.action,
                        error = %e,
                        "failed to write audit entry"
                    );
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "audit subscriber lagged behind the event bus");
                catch_up(audit.as_ref()).await;
            }
            Err(RecvError::Closed) => break,
        }
    }
}
