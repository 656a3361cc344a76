use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::models::{AuditEntry, Booking, BookingStatus, EventEnvelope, LifecycleEvent};
use crate::models::{ServiceRecord, StaffRecord};

/// Journal page size for catch-up reads.
pub const EVENT_PAGE: usize = 1000;

/// Result of a versioned write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Committed,
    /// The stored version no longer matches what the writer read.
    Conflict,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingFilter {
    pub date: Option<NaiveDate>,
    pub status: Option<BookingStatus>,
    pub staff_id: Option<String>,
    pub limit: Option<u32>,
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn get_booking(&self, tenant: &str, id: &str) -> anyhow::Result<Option<Booking>>;

    /// Inserts when `expected_version` is `None`, otherwise updates only if the
    /// stored row is still at that version.
    async fn put_booking(
        &self,
        booking: &Booking,
        expected_version: Option<u64>,
    ) -> anyhow::Result<PutOutcome>;

    /// Bookings on `date` whose status still holds the slot.
    async fn query_active_bookings(&self, tenant: &str, date: NaiveDate)
        -> anyhow::Result<Vec<Booking>>;

    async fn list_bookings(&self, tenant: &str, filter: &BookingFilter)
        -> anyhow::Result<Vec<Booking>>;

    /// Journals events and returns their ids in order.
    async fn append_events(&self, events: &[LifecycleEvent]) -> anyhow::Result<Vec<i64>>;

    /// At most [`EVENT_PAGE`] journaled events after `since_id`, oldest first.
    async fn events_since(&self, tenant: &str, since_id: i64) -> anyhow::Result<Vec<EventEnvelope>>;
}

#[async_trait]
pub trait StaffDirectory: Send + Sync {
    async fn list_active_staff(&self, tenant: &str) -> anyhow::Result<Vec<StaffRecord>>;

    /// `None` when the service does not restrict who may perform it.
    async fn service_allow_list(
        &self,
        tenant: &str,
        service_id: &str,
    ) -> anyhow::Result<Option<Vec<String>>>;

    async fn upsert_staff(&self, tenant: &str, staff: &StaffRecord) -> anyhow::Result<()>;

    async fn upsert_service(&self, tenant: &str, service: &ServiceRecord) -> anyhow::Result<()>;
}

#[async_trait]
pub trait AuditLog: Send + Sync {
    /// `false` when the entry's journal event already has an audit entry.
    async fn record(&self, entry: &AuditEntry) -> anyhow::Result<bool>;

    /// Journaled events after `after_id` with no audit entry yet, oldest first.
    async fn unaudited_events(&self, after_id: i64, limit: usize)
        -> anyhow::Result<Vec<EventEnvelope>>;

    async fn entries_for(
        &self,
        tenant: &str,
        booking_id: Option<&str>,
    ) -> anyhow::Result<Vec<AuditEntry>>;
}
