use anyhow::Context;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::booking::parse_hhmm;
use crate::models::{
    Actor, AuditEntry, Booking, BookingStatus, ClientInfo, EventEnvelope, LifecycleEvent, Role,
    ServiceRecord, StaffRecord, StaffStatus,
};
use crate::services::store::BookingFilter;

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

const BOOKING_COLUMNS: &str = "tenant_id, id, code, date, time, duration_minutes, starts_at, \
     client_name, client_phone, client_email, staff_id, branch_id, status, services, notes, \
     cancel_reason, created_by, version, created_at, updated_at";

fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.format(TS_FORMAT).to_string()
}

fn parse_ts(s: &str) -> anyhow::Result<DateTime<Utc>> {
    Ok(NaiveDateTime::parse_from_str(s, TS_FORMAT)
        .with_context(|| format!("invalid timestamp: {s}"))?
        .and_utc())
}

// ── Bookings ──

pub fn insert_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<bool> {
    let services = serde_json::to_string(&booking.services)?;
    let count = conn.execute(
        &format!(
            "INSERT INTO bookings ({BOOKING_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)
             ON CONFLICT(tenant_id, id) DO NOTHING"
        ),
        params![
            booking.tenant_id,
            booking.id,
            booking.code,
            booking.date.format(DATE_FORMAT).to_string(),
            booking.time.format("%H:%M").to_string(),
            booking.duration_minutes,
            booking.starts_at.map(|t| t.to_rfc3339()),
            booking.client.name,
            booking.client.phone,
            booking.client.email,
            booking.staff_id,
            booking.branch_id,
            booking.status.as_str(),
            services,
            booking.notes,
            booking.cancel_reason,
            booking.created_by,
            booking.version as i64,
            format_ts(&booking.created_at),
            format_ts(&booking.updated_at),
        ],
    )?;
    Ok(count > 0)
}

/// Writes `booking` only if the stored row is still at `expected_version`.
pub fn update_booking_if_version(
    conn: &Connection,
    booking: &Booking,
    expected_version: u64,
) -> anyhow::Result<bool> {
    let services = serde_json::to_string(&booking.services)?;
    let count = conn.execute(
        "UPDATE bookings SET
           staff_id = ?1, status = ?2, services = ?3, notes = ?4, cancel_reason = ?5,
           version = ?6, updated_at = ?7
         WHERE tenant_id = ?8 AND id = ?9 AND version = ?10",
        params![
            booking.staff_id,
            booking.status.as_str(),
            services,
            booking.notes,
            booking.cancel_reason,
            booking.version as i64,
            format_ts(&booking.updated_at),
            booking.tenant_id,
            booking.id,
            expected_version as i64,
        ],
    )?;
    Ok(count > 0)
}

pub fn get_booking(conn: &Connection, tenant: &str, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn
        .query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE tenant_id = ?1 AND id = ?2"),
            params![tenant, id],
            |row| Ok(parse_booking_row(row)),
        )
        .optional()?;

    result.transpose()
}

pub fn get_blocking_bookings_on(
    conn: &Connection,
    tenant: &str,
    date: NaiveDate,
) -> anyhow::Result<Vec<Booking>> {
    let blocking = BookingStatus::BLOCKING
        .iter()
        .map(|s| format!("'{}'", s.as_str()))
        .collect::<Vec<_>>()
        .join(", ");
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE tenant_id = ?1 AND date = ?2 AND status IN ({blocking})
         ORDER BY time ASC"
    ))?;

    let rows = stmt.query_map(
        params![tenant, date.format(DATE_FORMAT).to_string()],
        |row| Ok(parse_booking_row(row)),
    )?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn list_bookings(
    conn: &Connection,
    tenant: &str,
    filter: &BookingFilter,
) -> anyhow::Result<Vec<Booking>> {
    let mut sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE tenant_id = ?1");
    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(tenant.to_string())];

    if let Some(date) = filter.date {
        values.push(Box::new(date.format(DATE_FORMAT).to_string()));
        sql.push_str(&format!(" AND date = ?{}", values.len()));
    }
    if let Some(status) = filter.status {
        values.push(Box::new(status.as_str().to_string()));
        sql.push_str(&format!(" AND status = ?{}", values.len()));
    }
    if let Some(staff_id) = &filter.staff_id {
        values.push(Box::new(staff_id.clone()));
        // any service assignment counts, not just the primary staff member
        sql.push_str(&format!(
            " AND (staff_id = ?{n} OR EXISTS (SELECT 1 FROM json_each(bookings.services) \
             WHERE json_extract(json_each.value, '$.staff_id') = ?{n}))",
            n = values.len()
        ));
    }
    values.push(Box::new(filter.limit.unwrap_or(50) as i64));
    sql.push_str(&format!(" ORDER BY date DESC, time DESC LIMIT ?{}", values.len()));

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let date_str: String = row.get(3)?;
    let time_str: String = row.get(4)?;
    let duration_minutes: i64 = row.get(5)?;
    let starts_at: Option<String> = row.get(6)?;
    let status_str: String = row.get(12)?;
    let services_json: String = row.get(13)?;
    let version: i64 = row.get(17)?;
    let created_at: String = row.get(18)?;
    let updated_at: String = row.get(19)?;

    let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT)
        .with_context(|| format!("invalid booking date: {date_str}"))?;
    let time = parse_hhmm(&time_str)
        .with_context(|| format!("invalid booking time: {time_str}"))?;
    let starts_at = match starts_at {
        Some(s) => Some(
            DateTime::parse_from_rfc3339(&s)
                .with_context(|| format!("invalid starts_at: {s}"))?
                .with_timezone(&Utc),
        ),
        None => None,
    };
    let status = BookingStatus::parse(&status_str)
        .with_context(|| format!("unknown booking status: {status_str}"))?;
    let services = serde_json::from_str(&services_json).context("invalid services column")?;

    Ok(Booking {
        tenant_id: row.get(0)?,
        id: row.get(1)?,
        code: row.get(2)?,
        date,
        time,
        duration_minutes: u32::try_from(duration_minutes).context("negative duration")?,
        starts_at,
        client: ClientInfo {
            name: row.get(7)?,
            phone: row.get(8)?,
            email: row.get(9)?,
        },
        staff_id: row.get(10)?,
        branch_id: row.get(11)?,
        status,
        services,
        notes: row.get(14)?,
        cancel_reason: row.get(15)?,
        created_by: row.get(16)?,
        version: u64::try_from(version).context("negative version")?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

// ── Staff Directory ──

pub fn upsert_staff(conn: &Connection, tenant: &str, staff: &StaffRecord) -> anyhow::Result<()> {
    let schedule = serde_json::to_string(&staff.weekly_schedule)?;
    conn.execute(
        "INSERT INTO staff (tenant_id, id, name, phone, status, branch_id, weekly_schedule)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(tenant_id, id) DO UPDATE SET
           name = excluded.name,
           phone = excluded.phone,
           status = excluded.status,
           branch_id = excluded.branch_id,
           weekly_schedule = excluded.weekly_schedule,
           updated_at = datetime('now')",
        params![
            tenant,
            staff.id,
            staff.name,
            staff.phone,
            staff.status.as_str(),
            staff.branch_id,
            schedule,
        ],
    )?;
    Ok(())
}

pub fn list_active_staff(conn: &Connection, tenant: &str) -> anyhow::Result<Vec<StaffRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, phone, status, branch_id, weekly_schedule
         FROM staff WHERE tenant_id = ?1 AND status = ?2 ORDER BY id ASC",
    )?;

    let rows = stmt.query_map(params![tenant, StaffStatus::Active.as_str()], |row| {
        let status: String = row.get(3)?;
        let schedule: String = row.get(5)?;
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
            status,
            row.get::<_, Option<String>>(4)?,
            schedule,
        ))
    })?;

    let mut staff = vec![];
    for row in rows {
        let (id, name, phone, status, branch_id, schedule) = row?;
        staff.push(StaffRecord {
            status: StaffStatus::parse(&status)
                .with_context(|| format!("unknown staff status: {status}"))?,
            weekly_schedule: serde_json::from_str(&schedule)
                .with_context(|| format!("invalid weekly schedule for staff {id}"))?,
            id,
            name,
            phone,
            branch_id,
        });
    }
    Ok(staff)
}

pub fn upsert_service(conn: &Connection, tenant: &str, service: &ServiceRecord) -> anyhow::Result<()> {
    let staff_ids = service
        .staff_ids
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    conn.execute(
        "INSERT INTO service_staff (tenant_id, service_id, name, staff_ids)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(tenant_id, service_id) DO UPDATE SET
           name = excluded.name,
           staff_ids = excluded.staff_ids,
           updated_at = datetime('now')",
        params![tenant, service.id, service.name, staff_ids],
    )?;
    Ok(())
}

/// `Ok(None)` when the service is unknown or declares no allow-list.
pub fn get_service_allow_list(
    conn: &Connection,
    tenant: &str,
    service_id: &str,
) -> anyhow::Result<Option<Vec<String>>> {
    let raw: Option<Option<String>> = conn
        .query_row(
            "SELECT staff_ids FROM service_staff WHERE tenant_id = ?1 AND service_id = ?2",
            params![tenant, service_id],
            |row| row.get(0),
        )
        .optional()?;

    match raw.flatten() {
        Some(json) => Ok(Some(
            serde_json::from_str(&json).context("invalid staff allow-list")?,
        )),
        None => Ok(None),
    }
}

// ── Lifecycle Events ──

pub fn insert_events(conn: &mut Connection, events: &[LifecycleEvent]) -> anyhow::Result<Vec<i64>> {
    let tx = conn.transaction()?;
    let mut ids = Vec::with_capacity(events.len());
    for event in events {
        tx.execute(
            "INSERT INTO lifecycle_events (tenant_id, booking_id, kind, payload) VALUES (?1, ?2, ?3, ?4)",
            params![
                event.context.tenant_id,
                event.context.booking_id,
                event.kind.as_str(),
                serde_json::to_string(event)?,
            ],
        )?;
        ids.push(tx.last_insert_rowid());
    }
    tx.commit()?;
    Ok(ids)
}

pub fn get_events_since(
    conn: &Connection,
    tenant: &str,
    since_id: i64,
    limit: usize,
) -> anyhow::Result<Vec<EventEnvelope>> {
    let mut stmt = conn.prepare(
        "SELECT id, payload FROM lifecycle_events
         WHERE tenant_id = ?1 AND id > ?2
         ORDER BY id ASC LIMIT ?3",
    )?;
    let rows = stmt.query_map(params![tenant, since_id, limit as i64], envelope_columns)?;
    collect_envelopes(rows)
}

/// Journal entries, across tenants, that no audit entry points at yet.
pub fn get_unaudited_events(
    conn: &Connection,
    after_id: i64,
    limit: usize,
) -> anyhow::Result<Vec<EventEnvelope>> {
    let mut stmt = conn.prepare(
        "SELECT e.id, e.payload FROM lifecycle_events e
         WHERE e.id > ?1
           AND NOT EXISTS (SELECT 1 FROM audit_log a WHERE a.event_id = e.id)
         ORDER BY e.id ASC LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![after_id, limit as i64], envelope_columns)?;
    collect_envelopes(rows)
}

fn envelope_columns(row: &rusqlite::Row) -> rusqlite::Result<(i64, String)> {
    Ok((row.get(0)?, row.get(1)?))
}

fn collect_envelopes(
    rows: impl Iterator<Item = rusqlite::Result<(i64, String)>>,
) -> anyhow::Result<Vec<EventEnvelope>> {
    let mut events = vec![];
    for row in rows {
        let (id, payload) = row?;
        events.push(EventEnvelope {
            id: Some(id),
            event: serde_json::from_str(&payload).context("invalid event payload")?,
        });
    }
    Ok(events)
}

// ── Audit Log ──

/// Returns `false` when the entry's journal event was already audited.
pub fn insert_audit_entry(conn: &Connection, entry: &AuditEntry) -> anyhow::Result<bool> {
    let count = conn.execute(
        "INSERT INTO audit_log (tenant_id, actor_id, actor_role, action, entity, before_status, after_status, event_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(event_id) DO NOTHING",
        params![
            entry.tenant_id,
            entry.actor.id,
            entry.actor.role.as_str(),
            entry.action,
            entry.entity,
            entry.before_status.map(|s| s.as_str()),
            entry.after_status.as_str(),
            entry.event_id,
        ],
    )?;
    Ok(count == 1)
}

pub fn list_audit_entries(
    conn: &Connection,
    tenant: &str,
    entity: Option<&str>,
    limit: u32,
) -> anyhow::Result<Vec<AuditEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, tenant_id, actor_id, actor_role, action, entity, before_status, after_status, created_at, event_id
         FROM audit_log
         WHERE tenant_id = ?1 AND (?2 IS NULL OR entity = ?2)
         ORDER BY id ASC LIMIT ?3",
    )?;

    let rows = stmt.query_map(params![tenant, entity, limit as i64], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, Option<String>>(6)?,
            row.get::<_, String>(7)?,
            row.get::<_, String>(8)?,
            row.get::<_, Option<i64>>(9)?,
        ))
    })?;

    let mut entries = vec![];
    for row in rows {
        let (id, tenant_id, actor_id, role, action, entity, before, after, created_at, event_id) = row?;
        entries.push(AuditEntry {
            id: Some(id),
            tenant_id,
            actor: Actor::new(
                actor_id,
                Role::parse(&role).with_context(|| format!("unknown role: {role}"))?,
            ),
            action,
            entity,
            before_status: before.as_deref().and_then(BookingStatus::parse),
            after_status: BookingStatus::parse(&after)
                .with_context(|| format!("unknown booking status: {after}"))?,
            event_id,
            created_at: Some(created_at),
        });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{ApprovalStatus, BookingService};
    use chrono::NaiveTime;
    use std::collections::HashMap;

    fn setup_db() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    fn booking(id: &str, status: BookingStatus) -> Booking {
        let now = Utc::now();
        Booking {
            tenant_id: "salon-1".to_string(),
            id: id.to_string(),
            code: "BK-2024-031009-0001".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            duration_minutes: 60,
            starts_at: None,
            client: ClientInfo {
                name: "Alice".to_string(),
                phone: Some("+15551110000".to_string()),
                email: None,
            },
            staff_id: Some("s1".to_string()),
            branch_id: Some("main".to_string()),
            status,
            services: vec![BookingService {
                service_id: "cut".to_string(),
                name: "Haircut".to_string(),
                staff_id: Some("s1".to_string()),
                start_time: None,
                duration_minutes: None,
                approval: ApprovalStatus::Pending,
                responded_at: None,
                rejected_by: None,
                rejection_reason: None,
            }],
            notes: None,
            cancel_reason: None,
            created_by: "owner-1".to_string(),
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_insert_and_get_booking() {
        let conn = setup_db();
        let b = booking("b1", BookingStatus::AwaitingStaffApproval);
        assert!(insert_booking(&conn, &b).unwrap());

        let loaded = get_booking(&conn, "salon-1", "b1").unwrap().unwrap();
        assert_eq!(loaded.services, b.services);
        assert_eq!(loaded.status, BookingStatus::AwaitingStaffApproval);
        assert_eq!(loaded.time, b.time);
        assert_eq!(loaded.client, b.client);

        // scoped to tenant
        assert!(get_booking(&conn, "salon-2", "b1").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_insert_is_reported() {
        let conn = setup_db();
        let b = booking("b1", BookingStatus::Pending);
        assert!(insert_booking(&conn, &b).unwrap());
        assert!(!insert_booking(&conn, &b).unwrap());
    }

    #[test]
    fn test_update_requires_matching_version() {
        let conn = setup_db();
        let mut b = booking("b1", BookingStatus::AwaitingStaffApproval);
        insert_booking(&conn, &b).unwrap();

        b.status = BookingStatus::Confirmed;
        b.version = 2;
        assert!(update_booking_if_version(&conn, &b, 1).unwrap());

        // a second writer that read version 1 loses
        b.status = BookingStatus::Canceled;
        b.version = 2;
        assert!(!update_booking_if_version(&conn, &b, 1).unwrap());

        let loaded = get_booking(&conn, "salon-1", "b1").unwrap().unwrap();
        assert_eq!(loaded.status, BookingStatus::Confirmed);
        assert_eq!(loaded.version, 2);
    }

    #[test]
    fn test_blocking_bookings_skip_inactive_statuses() {
        let conn = setup_db();
        insert_booking(&conn, &booking("b1", BookingStatus::Confirmed)).unwrap();
        insert_booking(&conn, &booking("b2", BookingStatus::Canceled)).unwrap();
        insert_booking(&conn, &booking("b3", BookingStatus::StaffRejected)).unwrap();
        insert_booking(&conn, &booking("b4", BookingStatus::Pending)).unwrap();

        let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let active = get_blocking_bookings_on(&conn, "salon-1", date).unwrap();
        let ids: Vec<&str> = active.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"b1"));
        assert!(ids.contains(&"b4"));
    }

    #[test]
    fn test_list_bookings_filters() {
        let conn = setup_db();
        insert_booking(&conn, &booking("b1", BookingStatus::Confirmed)).unwrap();
        insert_booking(&conn, &booking("b2", BookingStatus::Canceled)).unwrap();

        let filter = BookingFilter {
            status: Some(BookingStatus::Canceled),
            ..Default::default()
        };
        let found = list_bookings(&conn, "salon-1", &filter).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "b2");

        let all = list_bookings(&conn, "salon-1", &BookingFilter::default()).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_list_bookings_matches_any_assigned_service() {
        let conn = setup_db();
        let mut b = booking("b1", BookingStatus::AwaitingStaffApproval);
        let mut color = b.services[0].clone();
        color.service_id = "color".to_string();
        color.name = "Color".to_string();
        color.staff_id = Some("s2".to_string());
        b.services.push(color);
        insert_booking(&conn, &b).unwrap();
        insert_booking(&conn, &booking("b2", BookingStatus::Confirmed)).unwrap();

        let by_second = BookingFilter {
            staff_id: Some("s2".to_string()),
            ..Default::default()
        };
        let found = list_bookings(&conn, "salon-1", &by_second).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "b1");

        let by_primary = BookingFilter {
            staff_id: Some("s1".to_string()),
            ..Default::default()
        };
        assert_eq!(list_bookings(&conn, "salon-1", &by_primary).unwrap().len(), 2);

        let nobody = BookingFilter {
            staff_id: Some("s9".to_string()),
            ..Default::default()
        };
        assert!(list_bookings(&conn, "salon-1", &nobody).unwrap().is_empty());
    }

    #[test]
    fn test_staff_directory_round_trip() {
        let conn = setup_db();
        let mut schedule = HashMap::new();
        schedule.insert(chrono::Weekday::Sun, "main".to_string());
        upsert_staff(
            &conn,
            "salon-1",
            &StaffRecord {
                id: "s1".to_string(),
                name: "Sam".to_string(),
                phone: None,
                status: StaffStatus::Active,
                branch_id: None,
                weekly_schedule: schedule,
            },
        )
        .unwrap();
        upsert_staff(
            &conn,
            "salon-1",
            &StaffRecord {
                id: "s2".to_string(),
                name: "Kim".to_string(),
                phone: None,
                status: StaffStatus::Suspended,
                branch_id: Some("main".to_string()),
                weekly_schedule: HashMap::new(),
            },
        )
        .unwrap();

        let active = list_active_staff(&conn, "salon-1").unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "s1");
        assert_eq!(active[0].branch_on(chrono::Weekday::Sun), Some("main"));
    }

    #[test]
    fn test_service_allow_list() {
        let conn = setup_db();
        upsert_service(
            &conn,
            "salon-1",
            &ServiceRecord {
                id: "color".to_string(),
                name: "Color".to_string(),
                staff_ids: Some(vec!["s1".to_string(), "s3".to_string()]),
            },
        )
        .unwrap();
        upsert_service(
            &conn,
            "salon-1",
            &ServiceRecord {
                id: "cut".to_string(),
                name: "Haircut".to_string(),
                staff_ids: None,
            },
        )
        .unwrap();

        assert_eq!(
            get_service_allow_list(&conn, "salon-1", "color").unwrap(),
            Some(vec!["s1".to_string(), "s3".to_string()])
        );
        assert_eq!(get_service_allow_list(&conn, "salon-1", "cut").unwrap(), None);
        assert_eq!(get_service_allow_list(&conn, "salon-1", "nails").unwrap(), None);
    }

    #[test]
    fn test_audit_entries_filter_by_entity() {
        let conn = setup_db();
        for entity in ["b1", "b2", "b1"] {
            insert_audit_entry(
                &conn,
                &AuditEntry {
                    id: None,
                    tenant_id: "salon-1".to_string(),
                    actor: Actor::new("owner-1", Role::Owner),
                    action: "BookingCreated".to_string(),
                    entity: entity.to_string(),
                    before_status: None,
                    after_status: BookingStatus::AwaitingStaffApproval,
                    event_id: None,
                    created_at: None,
                },
            )
            .unwrap();
        }

        assert_eq!(list_audit_entries(&conn, "salon-1", Some("b1"), 50).unwrap().len(), 2);
        assert_eq!(list_audit_entries(&conn, "salon-1", None, 50).unwrap().len(), 3);
        assert!(list_audit_entries(&conn, "salon-2", None, 50).unwrap().is_empty());
    }
}
