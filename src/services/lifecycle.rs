use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ConflictCheckPolicy;
use crate::errors::BookingError;
use crate::models::booking::{hhmm, hhmm_opt, minutes_of, MINUTES_PER_DAY};
use crate::models::{
    Actor, ApprovalStatus, Booking, BookingService, BookingStatus, ClientInfo, EventContext,
    EventKind, LifecycleEvent, Role, ServiceRef,
};
use crate::services::approval::aggregate_status;
use crate::services::booking_code;
use crate::services::events::EventBus;
use crate::services::locks::KeyedLocks;
use crate::services::scheduling::{ensure_slots_free, slots_of};
use crate::services::staffing::has_alternative;
use crate::services::store::{BookingFilter, BookingStore, PutOutcome, StaffDirectory};

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceRequest {
    pub service_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub staff_id: Option<String>,
    #[serde(default, with = "hhmm_opt")]
    pub start_time: Option<NaiveTime>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
}

/// A booking submission. Either `services` or a single `service` (with an
/// optional top-level `staff_id`) must be present.
#[derive(Debug, Clone, Deserialize)]
pub struct NewBooking {
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub duration_minutes: u32,
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    pub client: ClientInfo,
    #[serde(default)]
    pub branch_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub staff_id: Option<String>,
    #[serde(default)]
    pub service: Option<ServiceRequest>,
    #[serde(default)]
    pub services: Vec<ServiceRequest>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Accept,
    Reject,
}

impl Decision {
    pub fn approval(self) -> ApprovalStatus {
        match self {
            Decision::Accept => ApprovalStatus::Accepted,
            Decision::Reject => ApprovalStatus::Rejected,
        }
    }

    pub fn from_approval(approval: ApprovalStatus) -> Option<Self> {
        match approval {
            ApprovalStatus::Accepted => Some(Decision::Accept),
            ApprovalStatus::Rejected => Some(Decision::Reject),
            ApprovalStatus::Pending | ApprovalStatus::NeedsAssignment => None,
        }
    }

    /// Where the booking heads if this decision goes through.
    fn heading(self) -> BookingStatus {
        match self {
            Decision::Accept => BookingStatus::Confirmed,
            Decision::Reject => BookingStatus::StaffRejected,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StaffResponse {
    /// Omit to answer every service still pending for the responding staff member.
    #[serde(default)]
    pub service_id: Option<String>,
    pub decision: Decision,
    #[serde(default)]
    pub reason: Option<String>,
}

/// A committed booking together with the events it produced.
#[derive(Debug, Clone, Serialize)]
pub struct RevisedBooking {
    pub booking: Booking,
    pub before: Option<BookingStatus>,
    pub events: Vec<LifecycleEvent>,
}

/// Treats blanks and "any" placeholders as unassigned.
pub fn normalize_staff_id(staff_id: Option<String>) -> Option<String> {
    let id = staff_id?.trim().to_string();
    let key = id.to_ascii_lowercase().replace('-', "_");
    if id.is_empty() || key == "any" || key == "any_available" {
        None
    } else {
        Some(id)
    }
}

fn normalize_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn storage_error(e: anyhow::Error) -> BookingError {
    tracing::error!(error = %e, "booking storage failed");
    BookingError::DependencyUnavailable("booking storage".to_string())
}

fn validate_new(req: &NewBooking) -> Result<(), BookingError> {
    if req.client.name.trim().is_empty() {
        return Err(BookingError::Validation("client.name is required".to_string()));
    }
    if req.duration_minutes == 0 || req.duration_minutes > MINUTES_PER_DAY {
        return Err(BookingError::Validation(format!(
            "duration_minutes must be between 1 and {MINUTES_PER_DAY}"
        )));
    }
    if minutes_of(req.time).saturating_add(req.duration_minutes) > MINUTES_PER_DAY {
        return Err(BookingError::Validation(
            "booking must end on the same day".to_string(),
        ));
    }
    if req.service.is_some() && !req.services.is_empty() {
        return Err(BookingError::Validation(
            "send either service or services, not both".to_string(),
        ));
    }
    Ok(())
}

/// Normalises the request into the service list every booking carries.
fn build_services(req: &NewBooking) -> Result<Vec<BookingService>, BookingError> {
    let requested = if !req.services.is_empty() {
        req.services.clone()
    } else if let Some(single) = &req.service {
        let mut single = single.clone();
        if normalize_staff_id(single.staff_id.clone()).is_none() {
            single.staff_id = req.staff_id.clone();
        }
        vec![single]
    } else {
        return Err(BookingError::Validation(
            "at least one service is required".to_string(),
        ));
    };

    let mut seen = HashSet::new();
    let mut services = Vec::with_capacity(requested.len());
    for svc in requested {
        let service_id = svc.service_id.trim().to_string();
        if service_id.is_empty() {
            return Err(BookingError::Validation("service_id is required".to_string()));
        }
        if !seen.insert(service_id.clone()) {
            return Err(BookingError::Validation(format!(
                "service {service_id} is listed twice"
            )));
        }
        let duration = svc.duration_minutes.unwrap_or(req.duration_minutes);
        if duration == 0 || duration > MINUTES_PER_DAY {
            return Err(BookingError::Validation(format!(
                "service {service_id} duration must be between 1 and {MINUTES_PER_DAY}"
            )));
        }
        let start = minutes_of(svc.start_time.unwrap_or(req.time));
        if start.saturating_add(duration) > MINUTES_PER_DAY {
            return Err(BookingError::Validation(format!(
                "service {service_id} must end on the same day"
            )));
        }

        let staff_id = normalize_staff_id(svc.staff_id);
        let name = match svc.name.trim() {
            "" => service_id.clone(),
            name => name.to_string(),
        };
        services.push(BookingService {
            approval: if staff_id.is_some() {
                ApprovalStatus::Pending
            } else {
                ApprovalStatus::NeedsAssignment
            },
            service_id,
            name,
            staff_id,
            start_time: svc.start_time,
            duration_minutes: svc.duration_minutes,
            responded_at: None,
            rejected_by: None,
            rejection_reason: None,
        });
    }
    Ok(services)
}

/// Service indices a staff response applies to.
fn select_targets(
    booking: &Booking,
    actor_id: &str,
    service_id: Option<&str>,
    decision: Decision,
) -> Result<Vec<usize>, BookingError> {
    let not_assigned = || BookingError::NotAssigned {
        staff_id: actor_id.to_string(),
        booking_id: booking.id.clone(),
    };

    match service_id {
        Some(service_id) => {
            let idx = booking.service_index(service_id).ok_or_else(|| {
                BookingError::NotFound(format!("service {service_id} on booking {}", booking.id))
            })?;
            match booking.services[idx].staff_id.as_deref() {
                Some(staff) if staff == actor_id => Ok(vec![idx]),
                // an unassigned service can be claimed by accepting it
                None if decision == Decision::Accept => Ok(vec![idx]),
                _ => Err(not_assigned()),
            }
        }
        None => {
            let targets: Vec<usize> = booking
                .services
                .iter()
                .enumerate()
                .filter(|(_, s)| {
                    s.staff_id.as_deref() == Some(actor_id) && s.approval == ApprovalStatus::Pending
                })
                .map(|(i, _)| i)
                .collect();

            if !targets.is_empty() {
                Ok(targets)
            } else if booking.is_assigned_to(actor_id) {
                Err(BookingError::Validation(format!(
                    "no services on booking {} are awaiting a response from {actor_id}",
                    booking.id
                )))
            } else {
                Err(not_assigned())
            }
        }
    }
}

/// Owns every booking status change: creation, staff responses,
/// reassignment and explicit transitions.
pub struct LifecycleEngine {
    store: Arc<dyn BookingStore>,
    directory: Arc<dyn StaffDirectory>,
    events: EventBus,
    locks: KeyedLocks,
    policy: ConflictCheckPolicy,
}

impl LifecycleEngine {
    pub fn new(
        store: Arc<dyn BookingStore>,
        directory: Arc<dyn StaffDirectory>,
        events: EventBus,
        policy: ConflictCheckPolicy,
    ) -> Self {
        Self {
            store,
            directory,
            events,
            locks: KeyedLocks::new(),
            policy,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub async fn get_booking(&self, tenant: &str, id: &str) -> Result<Booking, BookingError> {
        self.store
            .get_booking(tenant, id)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| BookingError::NotFound(format!("booking {id}")))
    }

    pub async fn list_bookings(
        &self,
        tenant: &str,
        filter: &BookingFilter,
    ) -> Result<Vec<Booking>, BookingError> {
        self.store
            .list_bookings(tenant, filter)
            .await
            .map_err(storage_error)
    }

    /// Bumps the version and writes only if nobody else committed since the read.
    async fn commit(&self, booking: &mut Booking) -> Result<(), BookingError> {
        let expected = booking.version;
        booking.version += 1;
        booking.updated_at = Utc::now();

        match self
            .store
            .put_booking(booking, Some(expected))
            .await
            .map_err(storage_error)?
        {
            PutOutcome::Committed => Ok(()),
            PutOutcome::Conflict => {
                tracing::warn!(
                    tenant = %booking.tenant_id,
                    booking_id = %booking.id,
                    expected,
                    "booking changed underneath us"
                );
                Err(BookingError::Conflict(booking.id.clone()))
            }
        }
    }

    pub async fn create_booking(
        &self,
        tenant: &str,
        actor: &Actor,
        req: NewBooking,
    ) -> Result<RevisedBooking, BookingError> {
        validate_new(&req)?;
        let mut services = build_services(&req)?;
        let now = Utc::now();

        let status = match actor.role {
            // staff vouch for their own bookings
            Role::Staff => {
                for svc in &mut services {
                    if svc.staff_id.is_none() {
                        svc.staff_id = Some(actor.id.clone());
                    }
                    svc.approval = ApprovalStatus::Accepted;
                    svc.responded_at = Some(now);
                }
                BookingStatus::Confirmed
            }
            Role::Owner | Role::BranchAdmin => {
                let approvals: Vec<ApprovalStatus> = services.iter().map(|s| s.approval).collect();
                aggregate_status(&approvals)
            }
            Role::Customer => BookingStatus::Pending,
        };

        let mut booking = Booking {
            tenant_id: tenant.to_string(),
            id: uuid::Uuid::new_v4().to_string(),
            code: booking_code::generate(now),
            date: req.date,
            time: req.time,
            duration_minutes: req.duration_minutes,
            starts_at: req.starts_at,
            client: ClientInfo {
                name: req.client.name.trim().to_string(),
                phone: normalize_text(req.client.phone),
                email: normalize_text(req.client.email),
            },
            staff_id: None,
            branch_id: normalize_text(req.branch_id),
            status,
            services,
            notes: normalize_text(req.notes),
            cancel_reason: None,
            created_by: actor.id.clone(),
            version: 1,
            created_at: now,
            updated_at: now,
        };
        booking.sync_primary_staff();

        {
            let _slots = self.locks.lock(KeyedLocks::slots_key(tenant, booking.date)).await;
            ensure_slots_free(
                self.store.as_ref(),
                self.policy,
                tenant,
                booking.date,
                &slots_of(&booking),
                None,
            )
            .await?;

            match self
                .store
                .put_booking(&booking, None)
                .await
                .map_err(storage_error)?
            {
                PutOutcome::Committed => {}
                PutOutcome::Conflict => return Err(BookingError::Conflict(booking.id.clone())),
            }
        }

        tracing::info!(
            tenant,
            booking_id = %booking.id,
            code = %booking.code,
            status = %booking.status,
            role = %actor.role,
            "booking created"
        );

        let ctx = EventContext::from_booking(&booking, actor, None);
        let all: Vec<ServiceRef> = booking.services.iter().map(ServiceRef::from).collect();
        let mut events = vec![LifecycleEvent::new(EventKind::BookingCreated, ctx.clone())
            .with_services(all.clone())];
        if booking.status == BookingStatus::Confirmed {
            events.push(LifecycleEvent::new(EventKind::BookingConfirmed, ctx).with_services(all));
        }
        self.events.publish(&events).await;

        Ok(RevisedBooking {
            booking,
            before: None,
            events,
        })
    }

    /// A staff member accepts or rejects their service(s) on a booking.
    pub async fn respond(
        &self,
        tenant: &str,
        booking_id: &str,
        actor: &Actor,
        response: StaffResponse,
    ) -> Result<RevisedBooking, BookingError> {
        self.apply_decision(
            tenant,
            booking_id,
            actor,
            response.service_id.as_deref(),
            response.decision,
            normalize_text(response.reason),
        )
        .await
    }

    /// Moves one service to `accepted` or `rejected` and re-derives the booking status.
    pub async fn revise_service(
        &self,
        tenant: &str,
        booking_id: &str,
        service_id: &str,
        approval: ApprovalStatus,
        actor: &Actor,
    ) -> Result<RevisedBooking, BookingError> {
        let decision = Decision::from_approval(approval).ok_or_else(|| {
            BookingError::Validation(format!(
                "a service cannot be revised to {approval}; reassign it instead"
            ))
        })?;
        self.apply_decision(tenant, booking_id, actor, Some(service_id), decision, None)
            .await
    }

    async fn apply_decision(
        &self,
        tenant: &str,
        booking_id: &str,
        actor: &Actor,
        service_id: Option<&str>,
        decision: Decision,
        reason: Option<String>,
    ) -> Result<RevisedBooking, BookingError> {
        // managers move services between staff with reassign_service
        if actor.role != Role::Staff {
            return Err(BookingError::Forbidden {
                role: actor.role,
                action: "respond to a booking",
            });
        }

        let _guard = self.locks.lock(KeyedLocks::booking_key(tenant, booking_id)).await;
        let mut booking = self.get_booking(tenant, booking_id).await?;
        let before = booking.status;

        if !before.is_open_for_approval() {
            return Err(BookingError::InvalidTransition {
                from: before,
                to: decision.heading(),
            });
        }

        let targets = select_targets(&booking, &actor.id, service_id, decision)?;
        let next_approval = decision.approval();
        let now = Utc::now();
        for &idx in &targets {
            let svc = &mut booking.services[idx];
            if !svc.approval.can_become(next_approval) {
                return Err(BookingError::InvalidServiceTransition {
                    service_id: svc.service_id.clone(),
                    from: svc.approval,
                    to: next_approval,
                });
            }
            if svc.staff_id.is_none() {
                svc.staff_id = Some(actor.id.clone());
            }
            svc.approval = next_approval;
            svc.responded_at = Some(now);
            match decision {
                Decision::Accept => {
                    svc.rejected_by = None;
                    svc.rejection_reason = None;
                }
                Decision::Reject => {
                    svc.rejected_by = Some(actor.id.clone());
                    svc.rejection_reason = reason.clone();
                }
            }
        }
        booking.sync_primary_staff();

        let mut current = before;
        let routed = current == BookingStatus::Pending;
        if routed {
            current.validate_transition(BookingStatus::AwaitingStaffApproval)?;
            current = BookingStatus::AwaitingStaffApproval;
        }

        let mut next = aggregate_status(&booking.approvals());
        let mut cancel_reason = None;
        if decision == Decision::Reject {
            for &idx in &targets {
                let svc = &booking.services[idx];
                let found = has_alternative(
                    self.directory.as_ref(),
                    tenant,
                    &svc.service_id,
                    &actor.id,
                    booking.branch_id.as_deref(),
                    booking.date,
                )
                .await;
                if !found {
                    cancel_reason = Some(format!("no alternative staff available for {}", svc.name));
                    break;
                }
            }
            // one irrecoverable service cancels the whole booking
            if cancel_reason.is_some() {
                next = BookingStatus::Canceled;
            }
        }

        if next != current {
            current.validate_transition(next)?;
        }
        booking.status = next;
        if next == BookingStatus::Canceled {
            booking.cancel_reason = cancel_reason.clone();
        }

        self.commit(&mut booking).await?;

        tracing::info!(
            tenant,
            booking_id,
            staff_id = %actor.id,
            decision = ?decision,
            before = %before,
            after = %next,
            "staff response applied"
        );

        let ctx = EventContext::from_booking(&booking, actor, Some(before));
        let affected: Vec<ServiceRef> = targets
            .iter()
            .map(|&i| ServiceRef::from(&booking.services[i]))
            .collect();

        let mut events = vec![];
        if routed {
            events.push(LifecycleEvent::new(EventKind::BookingRouted, ctx.clone()));
        }
        let service_event = match decision {
            Decision::Accept => LifecycleEvent::new(EventKind::ServiceAccepted, ctx.clone()),
            Decision::Reject => {
                LifecycleEvent::new(EventKind::ServiceRejected, ctx.clone()).with_reason(reason)
            }
        };
        events.push(service_event.with_services(affected.clone()));

        match next {
            BookingStatus::Confirmed => {
                events.push(LifecycleEvent::new(EventKind::BookingConfirmed, ctx));
            }
            BookingStatus::Canceled => events.push(
                LifecycleEvent::new(EventKind::BookingAutoCanceled, ctx)
                    .with_services(affected)
                    .with_reason(cancel_reason),
            ),
            BookingStatus::StaffRejected if decision == Decision::Reject => events.push(
                LifecycleEvent::new(EventKind::BookingNeedsReassignment, ctx).with_services(affected),
            ),
            _ => {}
        }

        self.events.publish(&events).await;

        Ok(RevisedBooking {
            booking,
            before: Some(before),
            events,
        })
    }

    /// Hands a service to `staff_id` and puts it back into the approval pipeline.
    pub async fn reassign_service(
        &self,
        tenant: &str,
        booking_id: &str,
        service_id: &str,
        staff_id: &str,
        actor: &Actor,
    ) -> Result<RevisedBooking, BookingError> {
        if !actor.role.is_manager() {
            return Err(BookingError::Forbidden {
                role: actor.role,
                action: "reassign a service",
            });
        }
        let staff_id = normalize_staff_id(Some(staff_id.to_string())).ok_or_else(|| {
            BookingError::Validation("a concrete staff_id is required".to_string())
        })?;

        let _guard = self.locks.lock(KeyedLocks::booking_key(tenant, booking_id)).await;
        let mut booking = self.get_booking(tenant, booking_id).await?;
        let before = booking.status;

        if !before.is_open_for_approval() {
            return Err(BookingError::InvalidTransition {
                from: before,
                to: BookingStatus::AwaitingStaffApproval,
            });
        }

        let idx = booking.service_index(service_id).ok_or_else(|| {
            BookingError::NotFound(format!("service {service_id} on booking {booking_id}"))
        })?;
        {
            let svc = &mut booking.services[idx];
            svc.staff_id = Some(staff_id.clone());
            svc.approval = ApprovalStatus::Pending;
            svc.responded_at = None;
            svc.rejected_by = None;
            svc.rejection_reason = None;
        }
        booking.sync_primary_staff();

        let mut current = before;
        let routed = current == BookingStatus::Pending;
        if routed {
            current.validate_transition(BookingStatus::AwaitingStaffApproval)?;
            current = BookingStatus::AwaitingStaffApproval;
        }
        let next = aggregate_status(&booking.approvals());
        if next != current {
            current.validate_transition(next)?;
        }
        booking.status = next;

        {
            let _slots = self.locks.lock(KeyedLocks::slots_key(tenant, booking.date)).await;
            ensure_slots_free(
                self.store.as_ref(),
                self.policy,
                tenant,
                booking.date,
                &slots_of(&booking),
                Some(booking_id),
            )
            .await?;
            self.commit(&mut booking).await?;
        }

        tracing::info!(
            tenant,
            booking_id,
            service_id,
            staff_id = %staff_id,
            before = %before,
            after = %next,
            "service reassigned"
        );

        let ctx = EventContext::from_booking(&booking, actor, Some(before));
        let mut events = vec![];
        if routed {
            events.push(LifecycleEvent::new(EventKind::BookingRouted, ctx.clone()));
        }
        events.push(
            LifecycleEvent::new(EventKind::ServiceReassigned, ctx)
                .with_services(vec![ServiceRef::from(&booking.services[idx])]),
        );
        self.events.publish(&events).await;

        Ok(RevisedBooking {
            booking,
            before: Some(before),
            events,
        })
    }

    /// Explicit status change: completion, cancellation, or routing a customer submission.
    pub async fn transition(
        &self,
        tenant: &str,
        booking_id: &str,
        actor: &Actor,
        next: BookingStatus,
        reason: Option<String>,
    ) -> Result<RevisedBooking, BookingError> {
        if actor.role == Role::Customer && next != BookingStatus::Canceled {
            return Err(BookingError::Forbidden {
                role: actor.role,
                action: "set this booking status",
            });
        }

        let _guard = self.locks.lock(KeyedLocks::booking_key(tenant, booking_id)).await;
        let mut booking = self.get_booking(tenant, booking_id).await?;
        let before = booking.status;

        if actor.role == Role::Staff && !booking.is_assigned_to(&actor.id) {
            return Err(BookingError::NotAssigned {
                staff_id: actor.id.clone(),
                booking_id: booking.id.clone(),
            });
        }
        if actor.role == Role::Customer && (actor.is_anonymous() || actor.id != booking.created_by) {
            return Err(BookingError::Forbidden {
                role: actor.role,
                action: "cancel a booking they did not make",
            });
        }

        before.validate_transition(next)?;
        if next.is_derived() && next != aggregate_status(&booking.approvals()) {
            return Err(BookingError::InvalidTransition {
                from: before,
                to: next,
            });
        }

        let reason = normalize_text(reason);
        booking.status = next;
        if next == BookingStatus::Canceled {
            booking.cancel_reason = reason.clone();
        }
        self.commit(&mut booking).await?;

        tracing::info!(
            tenant,
            booking_id,
            actor = %actor.id,
            before = %before,
            after = %next,
            "booking status changed"
        );

        let kind = match next {
            BookingStatus::Completed => EventKind::BookingCompleted,
            BookingStatus::Canceled => EventKind::BookingCanceled,
            BookingStatus::Confirmed => EventKind::BookingConfirmed,
            _ => EventKind::BookingRouted,
        };
        let events = vec![LifecycleEvent::new(
            kind,
            EventContext::from_booking(&booking, actor, Some(before)),
        )
        .with_reason(reason)];
        self.events.publish(&events).await;

        Ok(RevisedBooking {
            booking,
            before: Some(before),
            events,
        })
    }
}
