use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};

use crate::models::{BookingStatus, EventEnvelope, EventKind, LifecycleEvent};
use crate::services::messaging::MessagingProvider;

/// Customer-facing SMS text for an event, if the customer should hear about it.
///
/// Internal approval states are never named here; customers only see
/// "being processed" or "being rescheduled".
pub fn customer_message(event: &LifecycleEvent) -> Option<String> {
    let ctx = &event.context;
    let when = format!(
        "{} at {}",
        ctx.date.format("%a %b %-d"),
        ctx.time.format("%H:%M")
    );
    let what = if ctx.service_names.is_empty() {
        "your appointment".to_string()
    } else {
        ctx.service_names.join(" + ")
    };
    let name = &ctx.client.name;
    let code = &ctx.booking_code;

    let body = match event.kind {
        // staff-created bookings are announced by BookingConfirmed
        EventKind::BookingCreated if ctx.after == BookingStatus::Confirmed => return None,
        EventKind::BookingCreated => format!(
            "Hi {name}, we received your booking {code} for {what} on {when}. \
             It is being processed and we'll confirm shortly."
        ),
        EventKind::BookingConfirmed => {
            format!("Hi {name}, your booking {code} for {what} on {when} is confirmed. See you then!")
        }
        EventKind::BookingNeedsReassignment => format!(
            "Hi {name}, your booking {code} on {when} is being rescheduled with another team member. \
             We'll be in touch shortly."
        ),
        EventKind::BookingAutoCanceled => format!(
            "Hi {name}, sorry, we couldn't arrange {what} on {when}, so booking {code} has been canceled. \
             Please book again at a time that suits you."
        ),
        EventKind::BookingCanceled => {
            format!("Hi {name}, your booking {code} on {when} has been canceled.")
        }
        EventKind::ServiceAccepted
        | EventKind::ServiceRejected
        | EventKind::ServiceReassigned
        | EventKind::BookingRouted
        | EventKind::BookingCompleted => return None,
    };

    Some(body)
}

/// Sends customer SMS for lifecycle events until the bus closes.
pub async fn run_notifier(
    messaging: Arc<dyn MessagingProvider>,
    mut rx: broadcast::Receiver<EventEnvelope>,
) {
    loop {
        let envelope = match rx.recv().await {
            Ok(envelope) => envelope,
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "notifier lagged behind the event bus");
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        let event = &envelope.event;
        let Some(body) = customer_message(event) else {
            continue;
        };
        let Some(phone) = event.context.client.phone.as_deref() else {
            tracing::debug!(booking_id = %event.context.booking_id, "no client phone, skipping SMS");
            continue;
        };

        if let Err(e) = messaging.send_message(phone, &body).await {
            tracing::warn!(
                booking_id = %event.context.booking_id,
                kind = event.kind.as_str(),
                error = %e,
                "failed to send customer SMS"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::booking::parse_hhmm;
    use crate::models::{Actor, ClientInfo, EventContext, Role};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    fn event(kind: EventKind, after: BookingStatus, phone: Option<&str>) -> LifecycleEvent {
        LifecycleEvent::new(
            kind,
            EventContext {
                tenant_id: "salon-1".to_string(),
                booking_id: "b1".to_string(),
                booking_code: "BK-2024-031010-0042".to_string(),
                client: ClientInfo {
                    name: "Alice".to_string(),
                    phone: phone.map(str::to_string),
                    email: None,
                },
                date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
                time: parse_hhmm("10:00").unwrap(),
                service_names: vec!["Haircut".to_string(), "Color".to_string()],
                staff_ids: vec!["s1".to_string()],
                actor: Actor::new("s1", Role::Staff),
                before: None,
                after,
            },
        )
    }

    struct MockMessaging {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl MessagingProvider for MockMessaging {
        async fn send_message(&self, to: &str, body: &str) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("provider down");
            }
            self.sent.lock().unwrap().push((to.to_string(), body.to_string()));
            Ok(())
        }
    }

    #[test]
    fn test_messages_never_leak_internal_states() {
        let kinds = [
            (EventKind::BookingCreated, BookingStatus::AwaitingStaffApproval),
            (EventKind::BookingCreated, BookingStatus::Pending),
            (EventKind::BookingConfirmed, BookingStatus::Confirmed),
            (EventKind::BookingNeedsReassignment, BookingStatus::StaffRejected),
            (EventKind::BookingAutoCanceled, BookingStatus::Canceled),
            (EventKind::BookingCanceled, BookingStatus::Canceled),
        ];
        for (kind, after) in kinds {
            let body = customer_message(&event(kind, after, None)).unwrap();
            let lower = body.to_lowercase();
            assert!(!lower.contains("rejected"), "{body}");
            assert!(!lower.contains("staffrejected"), "{body}");
            assert!(!lower.contains("awaiting"), "{body}");
            assert!(body.contains("BK-2024-031010-0042"));
        }
    }

    #[test]
    fn test_reassignment_is_phrased_as_rescheduling() {
        let body = customer_message(&event(
            EventKind::BookingNeedsReassignment,
            BookingStatus::StaffRejected,
            None,
        ))
        .unwrap();
        assert!(body.contains("being rescheduled"));

        let body = customer_message(&event(
            EventKind::BookingCreated,
            BookingStatus::AwaitingStaffApproval,
            None,
        ))
        .unwrap();
        assert!(body.contains("being processed"));
        assert!(body.contains("Sun Mar 10 at 10:00"));
    }

    #[test]
    fn test_silent_events() {
        assert!(customer_message(&event(EventKind::BookingCreated, BookingStatus::Confirmed, None)).is_none());
        assert!(customer_message(&event(EventKind::ServiceRejected, BookingStatus::StaffRejected, None)).is_none());
        assert!(customer_message(&event(EventKind::BookingCompleted, BookingStatus::Completed, None)).is_none());
    }

    #[tokio::test]
    async fn test_notifier_sends_to_client_phone() {
        let messaging = Arc::new(MockMessaging {
            sent: Mutex::new(vec![]),
            fail: false,
        });
        let (tx, rx) = broadcast::channel(8);
        let worker = tokio::spawn(run_notifier(messaging.clone(), rx));

        let events = [
            event(EventKind::BookingConfirmed, BookingStatus::Confirmed, Some("+15551110000")),
            event(EventKind::ServiceAccepted, BookingStatus::Confirmed, Some("+15551110000")),
            event(EventKind::BookingCanceled, BookingStatus::Canceled, None),
        ];
        for e in events {
            tx.send(EventEnvelope { id: None, event: e }).unwrap();
        }
        drop(tx);
        worker.await.unwrap();

        let sent = messaging.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "+15551110000");
        assert!(sent[0].1.contains("confirmed"));
    }

    #[tokio::test]
    async fn test_notifier_survives_provider_failure() {
        let messaging = Arc::new(MockMessaging {
            sent: Mutex::new(vec![]),
            fail: true,
        });
        let (tx, rx) = broadcast::channel(8);
        let worker = tokio::spawn(run_notifier(messaging, rx));

        for _ in 0..2 {
            tx.send(EventEnvelope {
                id: None,
                event: event(EventKind::BookingConfirmed, BookingStatus::Confirmed, Some("+1555")),
            })
            .unwrap();
        }
        drop(tx);
        // loop keeps going after a failed send and exits when the bus closes
        worker.await.unwrap();
    }
}
