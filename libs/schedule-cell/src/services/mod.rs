pub mod hours;
pub mod working_hours;

pub use hours::*;
pub use working_hours::ScheduleService;
