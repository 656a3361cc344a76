use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::Connection;

use super::queries;
use crate::models::{AuditEntry, Booking, EventEnvelope, LifecycleEvent, ServiceRecord, StaffRecord};
use crate::services::store::{
    AuditLog, BookingFilter, BookingStore, PutOutcome, StaffDirectory, EVENT_PAGE,
};

const AUDIT_PAGE: u32 = 500;

/// SQLite-backed implementation of every storage seam.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("database mutex poisoned"))
    }
}

#[async_trait]
impl BookingStore for SqliteStore {
    async fn get_booking(&self, tenant: &str, id: &str) -> anyhow::Result<Option<Booking>> {
        let conn = self.lock()?;
        queries::get_booking(&conn, tenant, id)
    }

    async fn put_booking(
        &self,
        booking: &Booking,
        expected_version: Option<u64>,
    ) -> anyhow::Result<PutOutcome> {
        let conn = self.lock()?;
        let written = match expected_version {
            None => queries::insert_booking(&conn, booking)?,
            Some(version) => queries::update_booking_if_version(&conn, booking, version)?,
        };
        Ok(if written {
            PutOutcome::Committed
        } else {
            PutOutcome::Conflict
        })
    }

    async fn query_active_bookings(
        &self,
        tenant: &str,
        date: NaiveDate,
    ) -> anyhow::Result<Vec<Booking>> {
        let conn = self.lock()?;
        queries::get_blocking_bookings_on(&conn, tenant, date)
    }

    async fn list_bookings(
        &self,
        tenant: &str,
        filter: &BookingFilter,
    ) -> anyhow::Result<Vec<Booking>> {
        let conn = self.lock()?;
        queries::list_bookings(&conn, tenant, filter)
    }

    async fn append_events(&self, events: &[LifecycleEvent]) -> anyhow::Result<Vec<i64>> {
        let mut conn = self.lock()?;
        queries::insert_events(&mut conn, events)
    }

    async fn events_since(&self, tenant: &str, since_id: i64) -> anyhow::Result<Vec<EventEnvelope>> {
        let conn = self.lock()?;
        queries::get_events_since(&conn, tenant, since_id, EVENT_PAGE)
    }
}

#[async_trait]
impl StaffDirectory for SqliteStore {
    async fn list_active_staff(&self, tenant: &str) -> anyhow::Result<Vec<StaffRecord>> {
        let conn = self.lock()?;
        queries::list_active_staff(&conn, tenant)
    }

    async fn service_allow_list(
        &self,
        tenant: &str,
        service_id: &str,
    ) -> anyhow::Result<Option<Vec<String>>> {
        let conn = self.lock()?;
        queries::get_service_allow_list(&conn, tenant, service_id)
    }

    async fn upsert_staff(&self, tenant: &str, staff: &StaffRecord) -> anyhow::Result<()> {
        let conn = self.lock()?;
        queries::upsert_staff(&conn, tenant, staff)
    }

    async fn upsert_service(&self, tenant: &str, service: &ServiceRecord) -> anyhow::Result<()> {
        let conn = self.lock()?;
        queries::upsert_service(&conn, tenant, service)
    }
}

#[async_trait]
impl AuditLog for SqliteStore {
    async fn record(&self, entry: &AuditEntry) -> anyhow::Result<bool> {
        let conn = self.lock()?;
        queries::insert_audit_entry(&conn, entry)
    }

    async fn unaudited_events(
        &self,
        after_id: i64,
        limit: usize,
    ) -> anyhow::Result<Vec<EventEnvelope>> {
        let conn = self.lock()?;
        queries::get_unaudited_events(&conn, after_id, limit)
    }

    async fn entries_for(
        &self,
        tenant: &str,
        booking_id: Option<&str>,
    ) -> anyhow::Result<Vec<AuditEntry>> {
        let conn = self.lock()?;
        queries::list_audit_entries(&conn, tenant, booking_id, AUDIT_PAGE)
    }
}
