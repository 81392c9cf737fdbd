pub mod validation;
pub mod booking;

pub use booking::BookingService;
