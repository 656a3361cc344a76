pub mod approval;
pub mod audit;
pub mod booking_code;
pub mod events;
pub mod lifecycle;
pub mod locks;
pub mod messaging;
pub mod notifications;
pub mod scheduling;
pub mod staffing;
pub mod store;
