pub mod booking;
pub mod completion;
pub mod lifecycle;

pub use booking::AppointmentBookingService;
pub use completion::AppointmentCompletionService;
pub use lifecycle::AppointmentLifecycleService;
