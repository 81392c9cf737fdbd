pub mod time;
pub mod aggregator;
pub mod slots;
pub mod occupancy;
pub mod clock;
pub mod schedule;
pub mod search;
pub mod repository;
pub mod availability;

pub use availability::{AvailabilityResult, AvailabilityService};
pub use clock::ClinicClock;
pub use repository::ScheduleRepository;
pub use schedule::SlotFilter;
