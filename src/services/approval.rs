use crate::models::{ApprovalStatus, BookingStatus};

/// Booking-level status implied by the services' approvals.
///
/// A single rejection outranks any acceptance: the booking must go through
/// reassignment or cancellation before it can move toward `Confirmed` again.
pub fn aggregate_status(approvals: &[ApprovalStatus]) -> BookingStatus {
    if approvals.is_empty() {
        return BookingStatus::AwaitingStaffApproval;
    }
    if approvals.iter().all(|a| *a == ApprovalStatus::Accepted) {
        return BookingStatus::Confirmed;
    }
    if approvals.contains(&ApprovalStatus::Rejected) {
        return BookingStatus::StaffRejected;
    }
    if approvals.contains(&ApprovalStatus::Accepted) {
        return BookingStatus::PartiallyApproved;
    }
    BookingStatus::AwaitingStaffApproval
}
