use chrono::{NaiveDate, NaiveTime};

use crate::config::ConflictCheckPolicy;
use crate::errors::BookingError;
use crate::models::booking::minutes_of;
use crate::models::Booking;
use crate::services::store::BookingStore;

/// Half-open interval test on minutes since midnight: touching ranges do not overlap.
pub fn overlaps(start_a: u32, end_a: u32, start_b: u32, end_b: u32) -> bool {
    start_a < end_b && start_b < end_a
}

/// A reserved interval for one staff member (or any staff member when `staff_id` is `None`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub staff_id: Option<String>,
    pub time: NaiveTime,
    pub start: u32,
    pub end: u32,
}

impl Slot {
    pub fn new(staff_id: Option<String>, time: NaiveTime, duration_minutes: u32) -> Self {
        let start = minutes_of(time);
        Self {
            staff_id,
            time,
            start,
            end: start.saturating_add(duration_minutes),
        }
    }

    /// Unassigned slots cannot be proven free, so they clash with anyone.
    fn same_staff(&self, other: &Slot) -> bool {
        match (&self.staff_id, &other.staff_id) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }

    fn clashes_with(&self, other: &Slot) -> bool {
        self.same_staff(other) && overlaps(self.start, self.end, other.start, other.end)
    }
}

/// One slot per service, or the primary slot for a booking without services.
pub fn slots_of(booking: &Booking) -> Vec<Slot> {
    if booking.services.is_empty() {
        return vec![Slot::new(
            booking.staff_id.clone(),
            booking.time,
            booking.duration_minutes,
        )];
    }

    booking
        .services
        .iter()
        .map(|service| {
            let (start, end) = booking.service_window(service);
            Slot {
                staff_id: service.staff_id.clone(),
                time: service.start_time.unwrap_or(booking.time),
                start,
                end,
            }
        })
        .collect()
}

fn format_minutes(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Rejects `candidate` if any slot collides with a blocking booking in `existing`.
pub fn check_slot_conflicts(
    candidate: &[Slot],
    existing: &[Booking],
    exclude_id: Option<&str>,
) -> Result<(), BookingError> {
    for booking in existing {
        if Some(booking.id.as_str()) == exclude_id || !booking.status.is_blocking() {
            continue;
        }

        for held in slots_of(booking) {
            for wanted in candidate {
                if !wanted.clashes_with(&held) {
                    continue;
                }

                let who = match &held.staff_id {
                    Some(staff) => format!("staff {staff}"),
                    None => "an unassigned booking".to_string(),
                };
                return Err(BookingError::SlotConflict {
                    time: wanted.time,
                    detail: format!(
                        "{who} is booked {}-{} ({})",
                        format_minutes(held.start),
                        format_minutes(held.end),
                        booking.code
                    ),
                });
            }
        }
    }

    Ok(())
}

/// Loads the tenant's blocking bookings for `date` and runs the conflict check.
/// A storage failure is resolved by `policy`.
pub async fn ensure_slots_free(
    store: &dyn BookingStore,
    policy: ConflictCheckPolicy,
    tenant: &str,
    date: NaiveDate,
    candidate: &[Slot],
    exclude_id: Option<&str>,
) -> Result<(), BookingError> {
    let existing = match store.query_active_bookings(tenant, date).await {
        Ok(bookings) => bookings,
        Err(e) => match policy {
            ConflictCheckPolicy::FailClosed => {
                tracing::error!(tenant, %date, error = %e, "conflict check could not read bookings");
                return Err(BookingError::DependencyUnavailable(format!(
                    "existing bookings for {date} could not be read"
                )));
            }
            ConflictCheckPolicy::FailOpen => {
                tracing::warn!(tenant, %date, error = %e, "conflict check skipped after storage error");
                return Ok(());
            }
        },
    };

    check_slot_conflicts(candidate, &existing, exclude_id)
}
