use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::models::actor::Actor;
use crate::models::booking::{hhmm, Booking, BookingService, BookingStatus, ClientInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    BookingCreated,
    ServiceAccepted,
    ServiceRejected,
    ServiceReassigned,
    BookingRouted,
    BookingConfirmed,
    BookingAutoCanceled,
    BookingNeedsReassignment,
    BookingCanceled,
    BookingCompleted,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::BookingCreated => "BookingCreated",
            EventKind::ServiceAccepted => "ServiceAccepted",
            EventKind::ServiceRejected => "ServiceRejected",
            EventKind::ServiceReassigned => "ServiceReassigned",
            EventKind::BookingRouted => "BookingRouted",
            EventKind::BookingConfirmed => "BookingConfirmed",
            EventKind::BookingAutoCanceled => "BookingAutoCanceled",
            EventKind::BookingNeedsReassignment => "BookingNeedsReassignment",
            EventKind::BookingCanceled => "BookingCanceled",
            EventKind::BookingCompleted => "BookingCompleted",
        }
    }
}

/// Everything a consumer needs to render a message without re-reading the booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventContext {
    pub tenant_id: String,
    pub booking_id: String,
    pub booking_code: String,
    pub client: ClientInfo,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub service_names: Vec<String>,
    pub staff_ids: Vec<String>,
    pub actor: Actor,
    pub before: Option<BookingStatus>,
    pub after: BookingStatus,
}

impl EventContext {
    pub fn from_booking(booking: &Booking, actor: &Actor, before: Option<BookingStatus>) -> Self {
        Self {
            tenant_id: booking.tenant_id.clone(),
            booking_id: booking.id.clone(),
            booking_code: booking.code.clone(),
            client: booking.client.clone(),
            date: booking.date,
            time: booking.time,
            service_names: booking.service_names(),
            staff_ids: booking.staff_ids(),
            actor: actor.clone(),
            before,
            after: booking.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRef {
    pub service_id: String,
    pub name: String,
    pub staff_id: Option<String>,
}

impl From<&BookingService> for ServiceRef {
    fn from(service: &BookingService) -> Self {
        Self {
            service_id: service.service_id.clone(),
            name: service.name.clone(),
            staff_id: service.staff_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub kind: EventKind,
    pub context: EventContext,
    /// Services this event is about; empty for booking-wide events.
    #[serde(default)]
    pub services: Vec<ServiceRef>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl LifecycleEvent {
    pub fn new(kind: EventKind, context: EventContext) -> Self {
        Self {
            kind,
            context,
            services: Vec::new(),
            reason: None,
        }
    }

    pub fn with_services(mut self, services: Vec<ServiceRef>) -> Self {
        self.services = services;
        self
    }

    pub fn with_reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }
}

/// An event as delivered to subscribers; `id` is its journal position when it was persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: Option<i64>,
    pub event: LifecycleEvent,
}

/// One compliance record per lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    #[serde(default)]
    pub id: Option<i64>,
    pub tenant_id: String,
    pub actor: Actor,
    pub action: String,
    pub entity: String,
    pub before_status: Option<BookingStatus>,
    pub after_status: BookingStatus,
    /// Journal id of the event this entry records.
    #[serde(default)]
    pub event_id: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
}
