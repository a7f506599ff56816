pub mod availability;
pub mod booking;
pub mod conflict;
pub mod lifecycle;
pub mod locking;

pub use availability::AvailabilityService;
pub use booking::AppointmentBookingService;
pub use conflict::ConflictGuard;
pub use lifecycle::AppointmentLifecycleService;
pub use locking::SchedulingLockService;
