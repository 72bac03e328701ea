pub mod availability;
pub mod blocks;
pub mod schedule;

pub use availability::AvailabilityService;
pub use blocks::BlockRegistry;
pub use schedule::ScheduleService;
