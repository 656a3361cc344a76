use std::sync::Arc;

use tokio::sync::broadcast;

use crate::models::{EventEnvelope, LifecycleEvent};
use crate::services::store::{BookingStore, EVENT_PAGE};

/// Fan-out for committed lifecycle events.
///
/// Events are journaled first so late subscribers can catch up, then
/// broadcast. Neither step can fail the caller: the booking write has
/// already committed by the time anything is published.
#[derive(Clone)]
pub struct EventBus {
    store: Arc<dyn BookingStore>,
    tx: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    pub fn new(store: Arc<dyn BookingStore>, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { store, tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    pub async fn publish(&self, events: &[LifecycleEvent]) -> Vec<EventEnvelope> {
        if events.is_empty() {
            return vec![];
        }

        let ids = match self.store.append_events(events).await {
            Ok(ids) => ids.into_iter().map(Some).collect(),
            Err(e) => {
                tracing::error!(error = %e, count = events.len(), "failed to journal lifecycle events");
                vec![None; events.len()]
            }
        };

        let envelopes: Vec<EventEnvelope> = events
            .iter()
            .cloned()
            .zip(ids)
            .map(|(event, id)| EventEnvelope { id, event })
            .collect();

        for envelope in &envelopes {
            tracing::info!(
                tenant = %envelope.event.context.tenant_id,
                booking_id = %envelope.event.context.booking_id,
                kind = envelope.event.kind.as_str(),
                status = %envelope.event.context.after,
                "lifecycle event"
            );
            // no receivers is fine
            let _ = self.tx.send(envelope.clone());
        }

        envelopes
    }
}

/// Every journaled event for `tenant` after `since_id`, read page by page.
pub async fn replay_since(
    store: &dyn BookingStore,
    tenant: &str,
    since_id: i64,
) -> anyhow::Result<Vec<EventEnvelope>> {
    let mut replay = vec![];
    let mut after = since_id;
    loop {
        let page = store.events_since(tenant, after).await?;
        let full = page.len() >= EVENT_PAGE;
        let last = page.last().and_then(|e| e.id);
        replay.extend(page);
        match last {
            Some(id) if full => after = id,
            _ => return Ok(replay),
        }
    }
}
