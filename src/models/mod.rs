pub mod actor;
pub mod booking;
pub mod event;
pub mod staff;

pub use actor::{Actor, Role};
pub use booking::{ApprovalStatus, Booking, BookingService, BookingStatus, ClientInfo};
pub use event::{AuditEntry, EventContext, EventEnvelope, EventKind, LifecycleEvent, ServiceRef};
pub use staff::{ServiceRecord, StaffRecord, StaffStatus};
