pub mod types;
pub mod generator;
pub mod summary;
pub mod conflicts;

pub use types::{AvailabilityEntry, AvailabilityStatus, Day, ScheduleOption, Shift, WeekAvailability, WeekId};
pub use generator::{generate_option, generate_options, OPTIONS_PER_REQUEST};
pub use summary::AvailabilityList;
pub use conflicts::find_duplicate_assignments;
