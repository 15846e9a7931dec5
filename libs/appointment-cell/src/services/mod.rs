pub mod blocks;
pub mod booking;
pub mod catalog;
pub mod flow;
pub mod lifecycle;
pub mod occupancy;
pub mod week;

pub use blocks::{BlockOutcome, BlockService};
pub use booking::{BookingContext, BookingService, ValidatedBooking};
pub use catalog::CatalogService;
pub use flow::BookingFlow;
pub use lifecycle::AppointmentLifecycleService;
pub use week::WeekService;
